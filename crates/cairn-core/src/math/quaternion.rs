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

//! Provides a Quaternion type for representing body orientations.

use serde::{Deserialize, Serialize};

use super::{Vec3, EPSILON};
use std::ops::{Add, Mul, Neg};

/// A rotation quaternion stored as `(x, y, z, w)`, where `[x, y, z]` is the
/// vector part and `w` the scalar part.
///
/// Orientations are kept as unit quaternions; the integrator renormalizes after
/// every update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Quaternion {
    /// The x component of the vector part.
    pub x: f32,
    /// The y component of the vector part.
    pub y: f32,
    /// The z component of the vector part.
    pub z: f32,
    /// The scalar (real) part.
    pub w: f32,
}

impl Quaternion {
    /// The identity quaternion, representing no rotation.
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Creates a new quaternion from its raw components.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a quaternion representing a rotation around `axis` by `angle_radians`.
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle_radians: f32) -> Self {
        let normalized_axis = axis.normalize();
        let (s, c) = (angle_radians * 0.5).sin_cos();
        Self {
            x: normalized_axis.x * s,
            y: normalized_axis.y * s,
            z: normalized_axis.z * s,
            w: c,
        }
    }

    /// Returns the shortest rotation that maps the unit vector `from` onto the unit vector `to`.
    pub fn from_rotation_arc(from: Vec3, to: Vec3) -> Self {
        let d = from.dot(to);
        if d >= 1.0 - EPSILON {
            return Self::IDENTITY;
        }
        if d <= -1.0 + EPSILON {
            // Opposite vectors: any perpendicular axis works.
            let mut axis = Vec3::X.cross(from);
            if axis.length_squared() < EPSILON {
                axis = Vec3::Y.cross(from);
            }
            return Self::from_axis_angle(axis, std::f32::consts::PI);
        }
        let c = from.cross(to);
        Self::new(c.x, c.y, c.z, 1.0 + d).normalize()
    }

    /// Calculates the squared length (magnitude) of the quaternion.
    #[inline]
    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// Calculates the length (magnitude) of the quaternion.
    #[inline]
    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    /// Returns a normalized version of the quaternion with a length of 1.
    /// If the quaternion has a near-zero or non-finite magnitude, it returns the identity.
    pub fn normalize(&self) -> Self {
        let mag_sq = self.magnitude_squared();
        if mag_sq > EPSILON && mag_sq.is_finite() {
            *self * (1.0 / mag_sq.sqrt())
        } else {
            Self::IDENTITY
        }
    }

    /// Computes the conjugate of the quaternion, which negates the vector part.
    /// For a unit quaternion this is also its inverse.
    #[inline]
    pub fn conjugate(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    /// Computes the dot product of two quaternions.
    #[inline]
    pub fn dot(&self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Rotates a 3D vector by this quaternion. Assumes a unit quaternion.
    #[inline]
    pub fn rotate_vec3(&self, v: Vec3) -> Vec3 {
        let u = Vec3::new(self.x, self.y, self.z);
        let s: f32 = self.w;
        2.0 * u.dot(v) * u + (s * s - u.dot(u)) * v + 2.0 * s * u.cross(v)
    }

    /// Returns `true` if no component is NaN or infinite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    /// Advances the orientation by the angular velocity `omega` (world frame) over `dt`.
    ///
    /// The rotation is applied as an exact axis-angle increment, so large
    /// angular velocities do not denormalize the result.
    pub fn integrate(&self, omega: Vec3, dt: f32) -> Self {
        let angle = omega.length() * dt;
        if angle <= EPSILON {
            return *self;
        }
        (Self::from_axis_angle(omega, angle) * *self).normalize()
    }

    /// Converts to a plain `[x, y, z, w]` array, the layout used on the telemetry wire.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

// --- Operator Overloads ---

impl Default for Quaternion {
    /// Returns the identity quaternion, representing no rotation.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Self;
    /// Combines two rotations using the Hamilton product (`self` applied after `rhs`).
    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        }
    }
}

impl Mul<Vec3> for Quaternion {
    type Output = Vec3;
    /// Rotates a `Vec3` by this quaternion.
    #[inline]
    fn mul(self, rhs: Vec3) -> Self::Output {
        self.rotate_vec3(rhs)
    }
}

impl Add<Quaternion> for Quaternion {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
            w: self.w + rhs.w,
        }
    }
}

impl Mul<f32> for Quaternion {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self::Output {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
            w: self.w * scalar,
        }
    }
}

impl Neg for Quaternion {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: -self.w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-4);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-4);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-4);
    }

    #[test]
    fn rotate_quarter_turn_about_y() {
        let q = Quaternion::from_axis_angle(Vec3::Y, FRAC_PI_2);
        assert_vec_eq(q * Vec3::X, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn conjugate_undoes_rotation() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, -2.0, 0.5), 1.2);
        let v = Vec3::new(0.3, 4.0, -2.0);
        assert_vec_eq(q.conjugate() * (q * v), v);
    }

    #[test]
    fn rotation_arc_maps_from_onto_to() {
        let cases = [
            (Vec3::X, Vec3::Y),
            (Vec3::X, Vec3::new(0.0, 1.0, 1.0).normalize()),
            (Vec3::X, -Vec3::X),
            (Vec3::Y, Vec3::Y),
        ];
        for (from, to) in cases {
            let q = Quaternion::from_rotation_arc(from, to);
            assert_relative_eq!(q.magnitude(), 1.0, epsilon = 1e-4);
            assert_vec_eq(q * from, to);
        }
    }

    #[test]
    fn integrate_matches_axis_angle_step() {
        let omega = Vec3::new(0.0, 0.0, 2.0);
        let q = Quaternion::IDENTITY.integrate(omega, 0.25);
        let expected = Quaternion::from_axis_angle(Vec3::Z, 0.5);
        assert_relative_eq!(q.dot(expected).abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn integrate_with_zero_velocity_is_identity() {
        let q = Quaternion::from_axis_angle(Vec3::X, 0.3);
        assert_eq!(q.integrate(Vec3::ZERO, 1.0 / 60.0), q);
    }

    #[test]
    fn normalize_rejects_non_finite() {
        let q = Quaternion::new(f32::NAN, 0.0, 0.0, 1.0);
        assert_eq!(q.normalize(), Quaternion::IDENTITY);
    }
}
