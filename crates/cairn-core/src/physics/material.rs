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

//! Surface materials and the per-pair combine policy.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// Friction and restitution coefficients attached to shapes.
///
/// A material is immutable once created and is shared by reference
/// (`Arc<Material>`) across every shape that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    static_friction: f32,
    dynamic_friction: f32,
    restitution: f32,
}

impl Material {
    /// Creates a material.
    ///
    /// Friction coefficients must be finite and non-negative; restitution must
    /// lie in `[0, 1]`.
    pub fn new(static_friction: f32, dynamic_friction: f32, restitution: f32) -> PhysicsResult<Self> {
        for (name, value) in [
            ("static friction", static_friction),
            ("dynamic friction", dynamic_friction),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::invalid_parameter(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&restitution) {
            return Err(PhysicsError::invalid_parameter(format!(
                "restitution must lie in [0, 1], got {restitution}"
            )));
        }
        Ok(Self {
            static_friction,
            dynamic_friction,
            restitution,
        })
    }

    /// Friction coefficient used while a contact is not sliding.
    pub fn static_friction(&self) -> f32 {
        self.static_friction
    }

    /// Friction coefficient used while a contact slides.
    pub fn dynamic_friction(&self) -> f32 {
        self.dynamic_friction
    }

    /// Bounciness coefficient.
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Combines the coefficients of two touching materials.
    ///
    /// Friction uses the geometric mean, so a frictionless surface stays
    /// frictionless against anything. Restitution takes the maximum of the pair.
    pub fn combine(&self, other: &Material) -> CombinedMaterial {
        CombinedMaterial {
            static_friction: (self.static_friction * other.static_friction).sqrt(),
            dynamic_friction: (self.dynamic_friction * other.dynamic_friction).sqrt(),
            restitution: self.restitution.max(other.restitution),
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            static_friction: 0.5,
            dynamic_friction: 0.5,
            restitution: 0.6,
        }
    }
}

/// The coefficients in effect for one contact pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CombinedMaterial {
    /// Combined static friction.
    pub static_friction: f32,
    /// Combined dynamic friction.
    pub dynamic_friction: f32,
    /// Combined restitution.
    pub restitution: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    #[test]
    fn combine_uses_geometric_mean_and_max() {
        let a = Material::new(0.4, 0.9, 0.2).unwrap();
        let b = Material::new(0.1, 0.1, 0.7).unwrap();
        let c = a.combine(&b);
        assert_relative_eq!(c.static_friction, 0.2, epsilon = 1e-6);
        assert_relative_eq!(c.dynamic_friction, 0.3, epsilon = 1e-6);
        assert_relative_eq!(c.restitution, 0.7);
        assert_eq!(c, b.combine(&a));
    }

    #[test]
    fn frictionless_material_dominates() {
        let ice = Material::new(0.0, 0.0, 0.0).unwrap();
        let rubber = Material::new(1.0, 0.8, 0.9).unwrap();
        let c = ice.combine(&rubber);
        assert_eq!(c.static_friction, 0.0);
        assert_eq!(c.dynamic_friction, 0.0);
        assert_eq!(c.restitution, 0.9);
    }

    #[test]
    fn rejects_out_of_range_coefficients() {
        for (s, d, r) in [(-0.1, 0.5, 0.5), (0.5, f32::NAN, 0.5), (0.5, 0.5, 1.5)] {
            let err = Material::new(s, d, r).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }
}
