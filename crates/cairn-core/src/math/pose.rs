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

//! Rigid transforms (rotation followed by translation).

use serde::{Deserialize, Serialize};

use super::{Quaternion, Vec3};
use std::ops::Mul;

/// A rigid transform: a point `p` in local space maps to `orientation * p + position`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Translation part.
    pub position: Vec3,
    /// Rotation part, a unit quaternion.
    pub orientation: Quaternion,
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quaternion::IDENTITY,
    };

    /// Creates a pose from a position and an orientation.
    #[inline]
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a pure translation.
    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quaternion::IDENTITY)
    }

    /// Maps a local point into the parent frame.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.orientation.rotate_vec3(p) + self.position
    }

    /// Maps a local direction into the parent frame (no translation).
    #[inline]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.orientation.rotate_vec3(v)
    }

    /// Maps a parent-frame point into local space.
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.orientation.conjugate().rotate_vec3(p - self.position)
    }

    /// Maps a parent-frame direction into local space.
    #[inline]
    pub fn inverse_transform_vector(&self, v: Vec3) -> Vec3 {
        self.orientation.conjugate().rotate_vec3(v)
    }

    /// The inverse transform.
    #[inline]
    pub fn inverse(&self) -> Self {
        let inv = self.orientation.conjugate();
        Self::new(inv.rotate_vec3(-self.position), inv)
    }

    /// Returns `true` if both the translation and rotation are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

impl Mul<Pose> for Pose {
    type Output = Pose;
    /// Composes two transforms: `(a * b).transform_point(p) == a.transform_point(b.transform_point(p))`.
    #[inline]
    fn mul(self, rhs: Pose) -> Pose {
        Pose::new(
            self.transform_point(rhs.position),
            (self.orientation * rhs.orientation).normalize(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn composition_matches_sequential_transform() {
        let a = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::from_axis_angle(Vec3::Y, 0.8),
        );
        let b = Pose::new(
            Vec3::new(-0.5, 0.0, 2.0),
            Quaternion::from_axis_angle(Vec3::X, -0.3),
        );
        let p = Vec3::new(0.25, -1.0, 0.75);
        let composed = (a * b).transform_point(p);
        let sequential = a.transform_point(b.transform_point(p));
        assert_relative_eq!(composed.x, sequential.x, epsilon = 1e-5);
        assert_relative_eq!(composed.y, sequential.y, epsilon = 1e-5);
        assert_relative_eq!(composed.z, sequential.z, epsilon = 1e-5);
    }

    #[test]
    fn inverse_round_trips_points() {
        let pose = Pose::new(
            Vec3::new(4.0, -1.0, 0.5),
            Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 1.0), 2.0),
        );
        let p = Vec3::new(3.0, 2.0, 1.0);
        let back = pose.inverse_transform_point(pose.transform_point(p));
        let via_inverse = pose.inverse().transform_point(pose.transform_point(p));
        for q in [back, via_inverse] {
            assert_relative_eq!(q.x, p.x, epsilon = 1e-4);
            assert_relative_eq!(q.y, p.y, epsilon = 1e-4);
            assert_relative_eq!(q.z, p.z, epsilon = 1e-4);
        }
    }
}
