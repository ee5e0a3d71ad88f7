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

//! Collision shapes: a geometry placed on a body and bound to a material.

use std::sync::Arc;

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Pose;

use super::geometry::Geometry;
use super::material::Material;

/// Collision geometry bound to a body at a local offset, with a shared material.
///
/// Shapes are reference counted so that many bodies (every box of a stack, for
/// instance) can share one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    geometry: Geometry,
    local_pose: Pose,
    material: Arc<Material>,
}

impl Shape {
    /// Creates a shape centred on its body's frame.
    ///
    /// Returns [`crate::ErrorKind::InvalidGeometry`] for zero-extent or non-finite geometry.
    pub fn new(geometry: Geometry, material: Arc<Material>) -> PhysicsResult<Self> {
        geometry.validate()?;
        Ok(Self {
            geometry,
            local_pose: Pose::IDENTITY,
            material,
        })
    }

    /// Places the shape at `local_pose` relative to its body.
    pub fn with_local_pose(mut self, local_pose: Pose) -> PhysicsResult<Self> {
        if !local_pose.is_finite() {
            return Err(PhysicsError::invalid_parameter(
                "shape local pose must be finite",
            ));
        }
        self.local_pose = Pose::new(local_pose.position, local_pose.orientation.normalize());
        Ok(self)
    }

    /// The collision geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Offset of the shape relative to its body.
    pub fn local_pose(&self) -> &Pose {
        &self.local_pose
    }

    /// The shared material.
    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// World pose of the shape for a body at `body_pose`.
    #[inline]
    pub fn world_pose(&self, body_pose: &Pose) -> Pose {
        *body_pose * self.local_pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::math::{Quaternion, Vec3};

    #[test]
    fn degenerate_geometry_is_rejected_at_creation() {
        let material = Arc::new(Material::default());
        let err = Shape::new(Geometry::cube(0.0), material).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidGeometry);
    }

    #[test]
    fn world_pose_applies_local_offset() {
        let shape = Shape::new(Geometry::sphere(1.0), Arc::new(Material::default()))
            .unwrap()
            .with_local_pose(Pose::from_position(Vec3::new(0.0, 1.0, 0.0)))
            .unwrap();
        let body = Pose::new(
            Vec3::new(5.0, 0.0, 0.0),
            Quaternion::from_axis_angle(Vec3::Z, std::f32::consts::FRAC_PI_2),
        );
        let world = shape.world_pose(&body);
        assert!((world.position - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-5);
    }
}
