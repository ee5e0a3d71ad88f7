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

//! The stacked-box scenario: a ground plane, pyramidal towers of cubes and an
//! optional projectile thrown at them.

use std::sync::Arc;

use cairn_core::error::{PhysicsError, PhysicsResult};
use cairn_core::math::{Pose, Vec3};
use cairn_core::physics::{BodyHandle, Geometry, Material, RigidBody, Shape};

use crate::factory::{create_dynamic, create_plane};
use crate::scene::Scene;

/// Centre offsets of the boxes of a pyramid of `size` rows, bottom row first.
///
/// Row `i` holds `size - i` boxes; box `j` of row `i` sits at
/// `((2j - (size - i - 1)) * h, (2i + 1) * h, 0)`.
pub fn stack_offsets(size: u32, half_extent: f32) -> Vec<Vec3> {
    let mut offsets = Vec::with_capacity((size * (size + 1) / 2) as usize);
    for i in 0..size {
        for j in 0..size - i {
            let x = (2 * j) as f32 - (size - i - 1) as f32;
            offsets.push(Vec3::new(
                x * half_extent,
                (2 * i + 1) as f32 * half_extent,
                0.0,
            ));
        }
    }
    offsets
}

/// Adds one pyramid of cubes at `base`. Every box shares `shape` and gets
/// `mass` mass units.
pub fn create_stack(
    scene: &mut Scene,
    base: Pose,
    size: u32,
    shape: &Arc<Shape>,
    mass: f32,
) -> PhysicsResult<Vec<BodyHandle>> {
    let Geometry::Box { half_extents } = *shape.geometry() else {
        return Err(PhysicsError::invalid_geometry("stacks are built from boxes"));
    };
    stack_offsets(size, half_extents.y)
        .into_iter()
        .map(|offset| {
            let pose = base * Pose::from_position(offset);
            let mut body = RigidBody::new_dynamic(pose)?.with_shape(Arc::clone(shape))?;
            body.set_mass_and_update_inertia(mass)?;
            scene.add_body(body)
        })
        .collect()
}

/// Start of a projectile thrown in interactive mode.
pub const THROW_ORIGIN: Vec3 = Vec3::new(0.0, 20.0, 60.0);
/// Where interactive projectiles are aimed.
pub const THROW_TARGET: Vec3 = Vec3::new(0.0, 10.0, -20.0);
/// Launch speed of interactive projectiles.
pub const THROW_SPEED: f32 = 100.0;

/// Throws a radius-3 sphere from [`THROW_ORIGIN`] towards the stacks.
pub fn throw_projectile(scene: &mut Scene, material: Arc<Material>) -> PhysicsResult<BodyHandle> {
    let direction = (THROW_TARGET - THROW_ORIGIN).normalize();
    let body = create_dynamic(
        Pose::from_position(THROW_ORIGIN),
        Geometry::sphere(3.0),
        material,
        10.0,
        direction * THROW_SPEED,
    )?;
    scene.add_body(body)
}

/// Handles of a built scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// The ground plane.
    pub ground: BodyHandle,
    /// Boxes of each stack, bottom row first.
    pub stacks: Vec<Vec<BodyHandle>>,
    /// The projectile, in batch mode.
    pub projectile: Option<BodyHandle>,
    /// The material shared by every shape.
    pub material: Arc<Material>,
}

/// Parameters of the stacked-box world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioBuilder {
    /// Number of stacks.
    pub stack_count: u32,
    /// Rows per stack.
    pub stack_size: u32,
    /// Half extent of each cube.
    pub half_extent: f32,
    /// Distance between stacks along -Z.
    pub stack_spacing: f32,
    /// Mass of each cube.
    pub box_mass: f32,
    /// `(static friction, dynamic friction, restitution)` of the shared material.
    pub material: (f32, f32, f32),
    /// Whether to launch the large sphere at the stacks.
    pub projectile: bool,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ScenarioBuilder {
    /// Five stacks of ten rows plus the projectile.
    pub fn baseline() -> Self {
        Self {
            stack_count: 5,
            stack_size: 10,
            half_extent: 2.0,
            stack_spacing: 10.0,
            box_mass: 10.0,
            material: (0.5, 0.5, 0.6),
            projectile: true,
        }
    }

    /// The baseline world without the projectile.
    pub fn interactive() -> Self {
        Self {
            projectile: false,
            ..Self::baseline()
        }
    }

    /// Number of dynamic bodies the scenario creates.
    pub fn dynamic_body_count(&self) -> usize {
        let per_stack = self.stack_size * (self.stack_size + 1) / 2;
        (self.stack_count * per_stack) as usize + usize::from(self.projectile)
    }

    /// Populates `scene`.
    pub fn build(&self, scene: &mut Scene) -> PhysicsResult<Scenario> {
        log::info!(
            "Building {} stacks of {} rows{}.",
            self.stack_count,
            self.stack_size,
            if self.projectile { " and a projectile" } else { "" }
        );
        let (static_friction, dynamic_friction, restitution) = self.material;
        let material = Arc::new(Material::new(static_friction, dynamic_friction, restitution)?);

        let ground = scene.add_body(create_plane(Vec3::Y, 0.0, Arc::clone(&material))?)?;

        let shape = Arc::new(Shape::new(Geometry::cube(self.half_extent), Arc::clone(&material))?);
        let stacks = (0..self.stack_count)
            .map(|k| {
                let z = -(k as f32) * self.stack_spacing;
                create_stack(
                    scene,
                    Pose::from_position(Vec3::new(0.0, 0.0, z)),
                    self.stack_size,
                    &shape,
                    self.box_mass,
                )
            })
            .collect::<PhysicsResult<Vec<_>>>()?;

        let projectile = if self.projectile {
            let body = create_dynamic(
                Pose::from_position(Vec3::new(0.0, 40.0, 100.0)),
                Geometry::sphere(10.0),
                Arc::clone(&material),
                10.0,
                Vec3::new(0.0, -50.0, -100.0),
            )?;
            Some(scene.add_body(body)?)
        } else {
            None
        };

        Ok(Scenario {
            ground,
            stacks,
            projectile,
            material,
        })
    }
}
