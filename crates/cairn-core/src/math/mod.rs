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

//! Math primitives used by the simulation kernels.
//!
//! Everything here is single precision and right-handed. Angles are in radians.

/// A small constant for floating-point comparisons.
pub const EPSILON: f32 = 1e-5;

pub mod geometry;
pub mod matrix;
pub mod pose;
pub mod quaternion;
pub mod vector;

pub use self::geometry::Aabb;
pub use self::matrix::Mat3;
pub use self::pose::Pose;
pub use self::quaternion::Quaternion;
pub use self::vector::Vec3;

/// Checks if two floats are approximately equal using [`EPSILON`].
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Builds an orthonormal pair of tangents perpendicular to the unit vector `n`.
///
/// The result is deterministic for a given `n`, which keeps friction directions
/// stable from one step to the next.
pub fn tangent_basis(n: Vec3) -> (Vec3, Vec3) {
    // Pick the reference axis least aligned with the normal.
    let reference = if n.x.abs() < 0.57735 { Vec3::X } else { Vec3::Y };
    let t1 = n.cross(reference).normalize();
    let t2 = n.cross(t1);
    (t1, t2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tangent_basis_is_orthonormal() {
        for n in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 2.0, -3.0).normalize()] {
            let (t1, t2) = tangent_basis(n);
            assert!(approx_eq(t1.length(), 1.0));
            assert!(approx_eq(t2.length(), 1.0));
            assert!(approx_eq(t1.dot(n), 0.0));
            assert!(approx_eq(t2.dot(n), 0.0));
            assert!(approx_eq(t1.dot(t2), 0.0));
        }
    }
}
