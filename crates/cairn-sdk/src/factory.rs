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

//! Shorthands for the bodies most scenes are made of.

use std::sync::Arc;

use cairn_core::error::{PhysicsError, PhysicsResult};
use cairn_core::math::{Pose, Quaternion, Vec3};
use cairn_core::physics::{Geometry, Material, RigidBody, Shape};

/// Angular damping given to bodies built by [`create_dynamic`].
pub const THROWN_ANGULAR_DAMPING: f32 = 0.5;

/// A dynamic body with a single shape, mass from `density`, an initial
/// `velocity` and an angular damping of 0.5.
pub fn create_dynamic(
    pose: Pose,
    geometry: Geometry,
    material: Arc<Material>,
    density: f32,
    velocity: Vec3,
) -> PhysicsResult<RigidBody> {
    let shape = Arc::new(Shape::new(geometry, material)?);
    let mut body = RigidBody::new_dynamic(pose)?.with_shape(shape)?;
    body.update_mass_and_inertia(density)?;
    body.set_angular_damping(THROWN_ANGULAR_DAMPING)?;
    body.set_linear_velocity(velocity)?;
    Ok(body)
}

/// A static infinite plane with outward `normal`, offset `distance` from the
/// origin along it. Solid space lies behind the plane.
pub fn create_plane(normal: Vec3, distance: f32, material: Arc<Material>) -> PhysicsResult<RigidBody> {
    let normal = normal
        .try_normalize()
        .ok_or_else(|| PhysicsError::invalid_geometry(format!("plane normal {normal:?} has no direction")))?;
    if !distance.is_finite() {
        return Err(PhysicsError::invalid_parameter(format!(
            "plane distance must be finite, got {distance}"
        )));
    }
    let pose = Pose::new(normal * distance, Quaternion::from_rotation_arc(Vec3::X, normal));
    RigidBody::new_static(pose)?.with_shape(Arc::new(Shape::new(Geometry::Plane, material)?))
}
