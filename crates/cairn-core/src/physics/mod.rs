// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The rigid-body data model and the kernels that operate on it.
//!
//! Data flows leaves first: a [`Material`] is shared by many [`Shape`]s, shapes
//! are attached to a [`RigidBody`], and bodies live in an [`Arena`] addressed by
//! generation-checked [`BodyHandle`]s. Each step, the broad phase finds
//! candidate pairs in a [`DynamicTree`], the [`NarrowPhase`] turns them into
//! [`ContactManifold`]s, the [`ContactSolver`] resolves them and the
//! [`Integrator`] advances the bodies.

pub mod body;
pub mod collision;
pub mod contact;
pub mod dynamic_tree;
pub mod geometry;
pub mod handle;
pub mod integrator;
pub mod material;
pub mod shape;
pub mod solver;
pub mod state;

pub use body::{BodyKind, DynamicState, MassPolicy, RigidBody};
pub use collision::NarrowPhase;
pub use contact::{Contact, ContactManifold, ContactPoint};
pub use dynamic_tree::{DynamicTree, ProxyId};
pub use geometry::{Geometry, GeometryKind, MassProperties};
pub use handle::{Arena, BodyHandle};
pub use integrator::{Integrator, Sanitized};
pub use material::{CombinedMaterial, Material};
pub use shape::Shape;
pub use solver::{CachedImpulse, ContactConstraint, ContactSolver, SolverSettings};
pub use state::BodyState;
