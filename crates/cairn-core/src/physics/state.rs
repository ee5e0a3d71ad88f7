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

//! Per-step working copies of body motion.

use crate::math::{Mat3, Pose, Vec3};

use super::body::RigidBody;

/// The motion state of one body while a step is being solved.
///
/// Worker tasks operate on these copies only; the scene's bodies are updated
/// from them after the step completes. Static bodies have zero inverse mass and
/// inertia, so impulses never move them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Pose of the body frame.
    pub pose: Pose,
    /// Centre of mass in the body frame.
    pub local_center: Vec3,
    /// Reciprocal mass; zero for static bodies.
    pub inv_mass: f32,
    /// Inverse inertia about the centre of mass, body axes.
    pub inv_inertia_local: Mat3,
    /// Inverse inertia in world axes, refreshed from `pose`.
    pub inv_inertia_world: Mat3,
    /// Linear velocity of the centre of mass.
    pub linear_velocity: Vec3,
    /// Angular velocity, world axes.
    pub angular_velocity: Vec3,
    /// Linear damping coefficient.
    pub linear_damping: f32,
    /// Angular damping coefficient.
    pub angular_damping: f32,
}

impl BodyState {
    /// An immovable state at `pose`.
    pub fn fixed(pose: Pose) -> Self {
        Self {
            pose,
            local_center: Vec3::ZERO,
            inv_mass: 0.0,
            inv_inertia_local: Mat3::ZERO,
            inv_inertia_world: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    /// Captures the current state of `body`.
    pub fn from_body(body: &RigidBody) -> Self {
        let Some(dynamic) = body.dynamic() else {
            return Self::fixed(*body.pose());
        };
        let mut state = Self {
            pose: *body.pose(),
            local_center: dynamic.center_of_mass(),
            inv_mass: dynamic.inverse_mass(),
            inv_inertia_local: dynamic.inverse_inertia_local(),
            inv_inertia_world: Mat3::ZERO,
            linear_velocity: dynamic.linear_velocity(),
            angular_velocity: dynamic.angular_velocity(),
            linear_damping: dynamic.linear_damping(),
            angular_damping: dynamic.angular_damping(),
        };
        state.refresh_world_inertia();
        state
    }

    /// Returns `true` if impulses can move this body.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.inv_mass > 0.0
    }

    /// World-space centre of mass.
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.pose.transform_point(self.local_center)
    }

    /// Recomputes `inv_inertia_world = R * I⁻¹ * Rᵀ` from the current orientation.
    pub fn refresh_world_inertia(&mut self) {
        self.inv_inertia_world = self
            .inv_inertia_local
            .rotated(&Mat3::from_quat(self.pose.orientation));
    }

    /// Velocity of the material point at offset `r` from the centre of mass.
    #[inline]
    pub fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    /// Applies `impulse` at offset `r` from the centre of mass.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * r.cross(impulse);
    }

    /// Linear momentum, zero for static bodies.
    pub fn momentum(&self) -> Vec3 {
        if self.is_dynamic() {
            self.linear_velocity / self.inv_mass
        } else {
            Vec3::ZERO
        }
    }
}
