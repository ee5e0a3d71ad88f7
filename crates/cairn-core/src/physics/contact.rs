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

//! Transient contact data produced by the narrow phase each step.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

use super::handle::BodyHandle;

/// Maximum number of points kept in one manifold.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// One point of a contact manifold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World-space position, midway between the two surfaces.
    pub position: Vec3,
    /// Penetration depth. Negative values are speculative separations.
    pub depth: f32,
}

/// The contact between two shapes: a shared normal and up to four points.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    /// Unit normal pointing from the first shape towards the second.
    pub normal: Vec3,
    /// Contact points.
    pub points: Vec<ContactPoint>,
}

impl ContactManifold {
    /// A manifold with a single point.
    pub fn single(normal: Vec3, position: Vec3, depth: f32) -> Self {
        Self {
            normal,
            points: vec![ContactPoint { position, depth }],
        }
    }

    /// Swaps the roles of the two shapes by reversing the normal.
    pub fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }

    /// Greatest penetration among the points.
    pub fn max_depth(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.depth)
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// A resolved contact point between two bodies, as published after a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// First body of the pair.
    pub body_a: BodyHandle,
    /// Second body of the pair.
    pub body_b: BodyHandle,
    /// World-space contact point.
    pub point: Vec3,
    /// Unit normal from `body_a` towards `body_b`.
    pub normal: Vec3,
    /// Penetration depth at the start of the step.
    pub depth: f32,
    /// Combined static friction of the pair.
    pub static_friction: f32,
    /// Combined dynamic friction of the pair.
    pub dynamic_friction: f32,
    /// Combined restitution of the pair.
    pub restitution: f32,
    /// Accumulated normal impulse applied by the solver.
    pub normal_impulse: f32,
}
