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

//! # Cairn Core
//!
//! Foundational crate for the cairn rigid-body simulator: math primitives, the
//! error taxonomy, the body/shape/material data model and the collision, solver
//! and integration kernels that the step lanes drive.

#![warn(missing_docs)]

pub mod error;
pub mod math;
pub mod physics;
pub mod telemetry;

pub use error::{ErrorKind, PhysicsError, PhysicsResult};
