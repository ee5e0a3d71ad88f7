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

//! Defines the `Mat3` type used for rotation and inertia tensors.

use serde::{Deserialize, Serialize};

use super::{Quaternion, Vec3};
use std::ops::{Add, Index, IndexMut, Mul};

/// A 3x3 column-major matrix.
///
/// In the simulator it holds rotation matrices and (inverse) inertia tensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Mat3 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec3; 3],
}

impl Mat3 {
    /// The 3x3 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec3::X, Vec3::Y, Vec3::Z],
    };

    /// A 3x3 matrix with all elements set to 0.
    pub const ZERO: Self = Self {
        cols: [Vec3::ZERO; 3],
    };

    /// Creates a new matrix from three column vectors.
    #[inline]
    pub fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self { cols: [c0, c1, c2] }
    }

    /// Creates a diagonal matrix.
    #[inline]
    pub fn from_diagonal(d: Vec3) -> Self {
        Self::from_cols(
            Vec3::new(d.x, 0.0, 0.0),
            Vec3::new(0.0, d.y, 0.0),
            Vec3::new(0.0, 0.0, d.z),
        )
    }

    /// Creates a rotation matrix from a quaternion.
    /// The quaternion is normalized before conversion to ensure a valid rotation matrix.
    #[inline]
    pub fn from_quat(q: Quaternion) -> Self {
        let q = q.normalize();
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        let x2 = x + x;
        let y2 = y + y;
        let z2 = z + z;
        let xx = x * x2;
        let xy = x * y2;
        let xz = x * z2;
        let yy = y * y2;
        let yz = y * z2;
        let zz = z * z2;
        let wx = w * x2;
        let wy = w * y2;
        let wz = w * z2;

        Self::from_cols(
            Vec3::new(1.0 - (yy + zz), xy + wz, xz - wy),
            Vec3::new(xy - wz, 1.0 - (xx + zz), yz + wx),
            Vec3::new(xz + wy, yz - wx, 1.0 - (xx + yy)),
        )
    }

    /// The outer product `a * bᵀ`.
    #[inline]
    pub fn outer(a: Vec3, b: Vec3) -> Self {
        Self::from_cols(a * b.x, a * b.y, a * b.z)
    }

    /// Returns row `index` as a `Vec3`.
    #[inline]
    pub fn row(&self, index: usize) -> Vec3 {
        Vec3::new(
            self.cols[0][index],
            self.cols[1][index],
            self.cols[2][index],
        )
    }

    /// Computes the determinant of the matrix.
    #[inline]
    pub fn determinant(&self) -> f32 {
        let [c0, c1, c2] = self.cols;
        c0.x * (c1.y * c2.z - c2.y * c1.z) - c1.x * (c0.y * c2.z - c2.y * c0.z)
            + c2.x * (c0.y * c1.z - c1.y * c0.z)
    }

    /// Returns the transpose of the matrix.
    #[inline]
    pub fn transpose(&self) -> Self {
        Self::from_cols(self.row(0), self.row(1), self.row(2))
    }

    /// Returns the matrix with the absolute value of every element.
    #[inline]
    pub fn abs(&self) -> Self {
        Self::from_cols(self.cols[0].abs(), self.cols[1].abs(), self.cols[2].abs())
    }

    /// Computes the inverse of the matrix, or `None` if it is singular.
    pub fn inverse(&self) -> Option<Self> {
        let [c0, c1, c2] = self.cols;
        let m00 = c1.y * c2.z - c2.y * c1.z;
        let m10 = c2.y * c0.z - c0.y * c2.z;
        let m20 = c0.y * c1.z - c1.y * c0.z;
        let det = c0.x * m00 + c1.x * m10 + c2.x * m20;

        // Inertia tensors of small bodies have tiny determinants, so only exact
        // singularity is rejected here.
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let inv_det = 1.0 / det;
        let m01 = c2.x * c1.z - c1.x * c2.z;
        let m11 = c0.x * c2.z - c2.x * c0.z;
        let m21 = c1.x * c0.z - c0.x * c1.z;
        let m02 = c1.x * c2.y - c2.x * c1.y;
        let m12 = c2.x * c0.y - c0.x * c2.y;
        let m22 = c0.x * c1.y - c1.x * c0.y;

        Some(Self::from_cols(
            Vec3::new(m00, m10, m20) * inv_det,
            Vec3::new(m01, m11, m21) * inv_det,
            Vec3::new(m02, m12, m22) * inv_det,
        ))
    }

    /// Re-expresses a body-frame tensor in world space: `R * self * Rᵀ`.
    #[inline]
    pub fn rotated(&self, rotation: &Mat3) -> Self {
        *rotation * *self * rotation.transpose()
    }
}

// --- Operator Overloads ---

impl Default for Mat3 {
    /// Returns the 3x3 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Add<Mat3> for Mat3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Mat3) -> Self::Output {
        Self::from_cols(
            self.cols[0] + rhs.cols[0],
            self.cols[1] + rhs.cols[1],
            self.cols[2] + rhs.cols[2],
        )
    }
}

impl Mul<Mat3> for Mat3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat3) -> Self::Output {
        Self::from_cols(self * rhs.cols[0], self * rhs.cols[1], self * rhs.cols[2])
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, v: Vec3) -> Self::Output {
        self.cols[0] * v.x + self.cols[1] * v.y + self.cols[2] * v.z
    }
}

impl Mul<f32> for Mat3 {
    type Output = Self;
    #[inline]
    fn mul(self, s: f32) -> Self::Output {
        Self::from_cols(self.cols[0] * s, self.cols[1] * s, self.cols[2] * s)
    }
}

impl Index<usize> for Mat3 {
    type Output = Vec3;
    /// Allows accessing a matrix column by index.
    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.cols[index]
    }
}

impl IndexMut<usize> for Mat3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.cols[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat_eq(a: Mat3, b: Mat3) {
        for c in 0..3 {
            for r in 0..3 {
                assert_relative_eq!(a.cols[c][r], b.cols[c][r], epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn inverse_of_singular_matrix_is_none() {
        assert!(Mat3::ZERO.inverse().is_none());
        let rank_two = Mat3::from_cols(Vec3::X, Vec3::Y, Vec3::X + Vec3::Y);
        assert!(rank_two.inverse().is_none());
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let m = Mat3::from_cols(
            Vec3::new(2.0, 0.5, 0.0),
            Vec3::new(0.0, 3.0, 1.0),
            Vec3::new(1.0, 0.0, 4.0),
        );
        let inv = m.inverse().expect("matrix is invertible");
        assert_mat_eq(m * inv, Mat3::IDENTITY);
    }

    #[test]
    fn quaternion_matrix_rotates_like_quaternion() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7);
        let m = Mat3::from_quat(q);
        let v = Vec3::new(0.5, -1.0, 2.0);
        let a = m * v;
        let b = q * v;
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn rotated_diagonal_tensor_stays_symmetric() {
        let inertia = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
        let r = Mat3::from_quat(Quaternion::from_axis_angle(Vec3::new(0.2, 1.0, -0.4), 1.1));
        let world = inertia.rotated(&r);
        assert_mat_eq(world, world.transpose());
        assert_relative_eq!(world.determinant(), 6.0, epsilon = 1e-3);
    }
}
