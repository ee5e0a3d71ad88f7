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

//! # Cairn SDK
//!
//! The public face of the simulator. A [`PhysicsContext`] is built from a
//! [`PhysicsConfig`] and owns the worker pool, the telemetry service and the
//! [`Scene`]. Worlds are populated body by body or through the
//! [`ScenarioBuilder`], then advanced with `simulate` / `fetch_results`.
//!
//! ```no_run
//! use cairn_sdk::{PhysicsConfig, PhysicsContext, ScenarioBuilder};
//!
//! let mut context = PhysicsContext::new(PhysicsConfig::default())?;
//! ScenarioBuilder::baseline().build(context.scene_mut())?;
//! for _ in 0..2500 {
//!     context.scene_mut().simulate(1.0 / 60.0)?;
//!     context.scene_mut().fetch_results(true)?;
//! }
//! context.shutdown();
//! # Ok::<(), cairn_sdk::PhysicsError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod factory;
pub mod scenario;
pub mod scene;

pub use cairn_core::math::{Pose, Quaternion, Vec3};
pub use cairn_core::physics::{BodyHandle, Contact, Geometry, Material, RigidBody, Shape};
pub use cairn_core::{ErrorKind, PhysicsError, PhysicsResult};
pub use cairn_telemetry::{MemoryTransport, SimulationStats, WireFormat};

pub use config::{PhysicsConfig, SleepConfig, TelemetryConfig};
pub use context::PhysicsContext;
pub use factory::{create_dynamic, create_plane};
pub use scenario::{create_stack, stack_offsets, throw_projectile, Scenario, ScenarioBuilder};
pub use scene::Scene;
