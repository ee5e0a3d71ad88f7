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

//! Collision geometry as a closed sum type, plus the mass properties derived from it.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{Aabb, Mat3, Pose, Vec3};

/// The collision geometry of a shape, expressed in the shape's local frame.
///
/// A `Plane` is the infinite half-space `x <= 0` of its frame: the local +X
/// axis is the outward normal and the frame origin lies on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// A box centred on the frame origin.
    Box {
        /// Half the size of the box along each local axis.
        half_extents: Vec3,
    },
    /// A sphere centred on the frame origin.
    Sphere {
        /// The sphere radius.
        radius: f32,
    },
    /// An infinite static half-space.
    Plane,
}

/// The variant tag of a [`Geometry`], used to index the narrow-phase dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    /// See [`Geometry::Box`].
    Box = 0,
    /// See [`Geometry::Sphere`].
    Sphere = 1,
    /// See [`Geometry::Plane`].
    Plane = 2,
}

impl GeometryKind {
    /// Number of geometry kinds.
    pub const COUNT: usize = 3;

    /// Dense index of this kind.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Geometry {
    /// A box with the given half extents.
    pub fn cuboid(hx: f32, hy: f32, hz: f32) -> Self {
        Geometry::Box {
            half_extents: Vec3::new(hx, hy, hz),
        }
    }

    /// A cube with the same half extent on every axis.
    pub fn cube(half_extent: f32) -> Self {
        Self::cuboid(half_extent, half_extent, half_extent)
    }

    /// A sphere of the given radius.
    pub fn sphere(radius: f32) -> Self {
        Geometry::Sphere { radius }
    }

    /// The variant tag.
    #[inline]
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Box { .. } => GeometryKind::Box,
            Geometry::Sphere { .. } => GeometryKind::Sphere,
            Geometry::Plane => GeometryKind::Plane,
        }
    }

    /// Rejects zero-extent and non-finite geometry.
    pub fn validate(&self) -> PhysicsResult<()> {
        match *self {
            Geometry::Box { half_extents } => {
                for axis in 0..3 {
                    let h = half_extents[axis];
                    if !h.is_finite() || h <= 0.0 {
                        return Err(PhysicsError::invalid_geometry(format!(
                            "box half extent on axis {axis} must be positive and finite, got {h}"
                        )));
                    }
                }
                Ok(())
            }
            Geometry::Sphere { radius } => {
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(PhysicsError::invalid_geometry(format!(
                        "sphere radius must be positive and finite, got {radius}"
                    )));
                }
                Ok(())
            }
            Geometry::Plane => Ok(()),
        }
    }

    /// Returns `false` for geometry with no finite bounding box.
    #[inline]
    pub fn is_bounded(&self) -> bool {
        !matches!(self, Geometry::Plane)
    }

    /// Volume of the geometry, or `None` for a plane.
    pub fn volume(&self) -> Option<f32> {
        match *self {
            Geometry::Box { half_extents: h } => Some(8.0 * h.x * h.y * h.z),
            Geometry::Sphere { radius } => {
                Some(4.0 / 3.0 * std::f32::consts::PI * radius * radius * radius)
            }
            Geometry::Plane => None,
        }
    }

    /// World-space bounding box of the geometry placed at `pose`, or `None` for a plane.
    pub fn compute_aabb(&self, pose: &Pose) -> Option<Aabb> {
        match *self {
            Geometry::Box { half_extents } => {
                let rotation = Mat3::from_quat(pose.orientation).abs();
                Some(Aabb::from_center_half_extents(
                    pose.position,
                    rotation * half_extents,
                ))
            }
            Geometry::Sphere { radius } => Some(Aabb::from_center_half_extents(
                pose.position,
                Vec3::splat(radius),
            )),
            Geometry::Plane => None,
        }
    }

    /// Mass properties of the geometry filled with material of `density`, in the
    /// geometry's own frame. Planes have none.
    pub fn mass_properties(&self, density: f32) -> Option<MassProperties> {
        let mass = density * self.volume()?;
        let inertia = match *self {
            Geometry::Box { half_extents: h } => {
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 3.0)
            }
            Geometry::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            Geometry::Plane => return None,
        };
        Some(MassProperties {
            mass,
            center: Vec3::ZERO,
            inertia: Mat3::from_diagonal(inertia),
        })
    }
}

/// Mass, centre of mass and inertia tensor (about the centre of mass).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    /// Total mass.
    pub mass: f32,
    /// Centre of mass in the frame the properties are expressed in.
    pub center: Vec3,
    /// Inertia tensor about `center`, axes of the same frame.
    pub inertia: Mat3,
}

impl MassProperties {
    /// Re-expresses these properties in the parent frame of `pose`.
    pub fn transformed(&self, pose: &Pose) -> Self {
        let rotation = Mat3::from_quat(pose.orientation);
        Self {
            mass: self.mass,
            center: pose.transform_point(self.center),
            inertia: self.inertia.rotated(&rotation),
        }
    }

    /// Sums several parts expressed in the same frame, shifting each inertia
    /// tensor to the combined centre of mass (parallel-axis theorem).
    pub fn combine(parts: &[MassProperties]) -> Option<Self> {
        let mass: f32 = parts.iter().map(|p| p.mass).sum();
        if mass <= 0.0 || !mass.is_finite() {
            return None;
        }
        let center = parts
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + p.center * p.mass)
            / mass;
        let inertia = parts.iter().fold(Mat3::ZERO, |acc, p| {
            let d = p.center - center;
            let shift = Mat3::from_diagonal(Vec3::splat(d.dot(d))) + Mat3::outer(d, d) * -1.0;
            acc + p.inertia + shift * p.mass
        });
        Some(Self {
            mass,
            center,
            inertia,
        })
    }

    /// Rescales mass and inertia so the total mass equals `target`.
    pub fn with_mass(&self, target: f32) -> Self {
        let scale = target / self.mass;
        Self {
            mass: target,
            center: self.center,
            inertia: self.inertia * scale,
        }
    }
}
