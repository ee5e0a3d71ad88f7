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

//! Rigid bodies: a pose, a set of shapes and, for dynamic bodies, mass and motion state.

use std::sync::Arc;

use crate::error::{ErrorKind, PhysicsError, PhysicsResult};
use crate::math::{Aabb, Mat3, Pose, Vec3};

use super::geometry::MassProperties;
use super::shape::Shape;

/// Default angular damping of a dynamic body.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.05;

/// How a dynamic body's mass is derived from its shapes.
///
/// The policy is remembered so that attaching another shape later recomputes
/// the mass the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MassPolicy {
    /// Mass is `density * volume`, summed over shapes.
    Density(f32),
    /// Mass is fixed; inertia follows the shape distribution.
    Mass(f32),
}

/// Mass and motion state carried by dynamic bodies only.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicState {
    mass: f32,
    inv_mass: f32,
    center_of_mass: Vec3,
    inv_inertia_local: Mat3,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    linear_damping: f32,
    angular_damping: f32,
    mass_policy: MassPolicy,
    sleep_frames: u32,
    asleep: bool,
}

impl DynamicState {
    fn unit() -> Self {
        Self {
            mass: 1.0,
            inv_mass: 1.0,
            center_of_mass: Vec3::ZERO,
            inv_inertia_local: Mat3::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            mass_policy: MassPolicy::Density(1.0),
            sleep_frames: 0,
            asleep: false,
        }
    }

    /// Body mass.
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Reciprocal of the mass.
    pub fn inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Centre of mass in the body frame.
    pub fn center_of_mass(&self) -> Vec3 {
        self.center_of_mass
    }

    /// Inverse inertia tensor about the centre of mass, in body axes.
    pub fn inverse_inertia_local(&self) -> Mat3 {
        self.inv_inertia_local
    }

    /// Linear velocity of the centre of mass.
    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    /// Angular velocity in world axes.
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Linear damping coefficient.
    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Angular damping coefficient.
    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// The rule used to derive the mass.
    pub fn mass_policy(&self) -> MassPolicy {
        self.mass_policy
    }

    /// Consecutive steps spent below the sleep thresholds.
    pub fn sleep_frames(&self) -> u32 {
        self.sleep_frames
    }

    /// Whether the body is asleep.
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }
}

/// Whether a body takes part in integration.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    /// Never moved by the simulation.
    Static,
    /// Integrated under gravity and contact impulses.
    Dynamic(DynamicState),
}

/// A body in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pose: Pose,
    shapes: Vec<Arc<Shape>>,
    kind: BodyKind,
}

fn check_pose(pose: &Pose) -> PhysicsResult<Pose> {
    if !pose.is_finite() {
        return Err(PhysicsError::invalid_parameter("body pose must be finite"));
    }
    Ok(Pose::new(pose.position, pose.orientation.normalize()))
}

fn check_vector(name: &str, v: Vec3) -> PhysicsResult<()> {
    if !v.is_finite() {
        return Err(PhysicsError::invalid_parameter(format!(
            "{name} must be finite, got {v:?}"
        )));
    }
    Ok(())
}

impl RigidBody {
    /// Creates a static body with no shapes.
    pub fn new_static(pose: Pose) -> PhysicsResult<Self> {
        Ok(Self {
            pose: check_pose(&pose)?,
            shapes: Vec::new(),
            kind: BodyKind::Static,
        })
    }

    /// Creates a dynamic body with no shapes, unit mass and unit inertia.
    pub fn new_dynamic(pose: Pose) -> PhysicsResult<Self> {
        Ok(Self {
            pose: check_pose(&pose)?,
            shapes: Vec::new(),
            kind: BodyKind::Dynamic(DynamicState::unit()),
        })
    }

    /// Builder form of [`RigidBody::attach_shape`].
    pub fn with_shape(mut self, shape: Arc<Shape>) -> PhysicsResult<Self> {
        self.attach_shape(shape)?;
        Ok(self)
    }

    /// Attaches a shape.
    ///
    /// For a dynamic body the mass and inertia are recomputed with the body's
    /// current [`MassPolicy`]. Planes may only be attached to static bodies.
    pub fn attach_shape(&mut self, shape: Arc<Shape>) -> PhysicsResult<()> {
        if self.is_dynamic() && !shape.geometry().is_bounded() {
            return Err(PhysicsError::invalid_geometry(
                "plane geometry can only be attached to static bodies",
            ));
        }
        self.shapes.push(shape);
        let policy = match &self.kind {
            BodyKind::Dynamic(state) => state.mass_policy,
            BodyKind::Static => return Ok(()),
        };
        if let Err(err) = self.recompute_mass(policy) {
            self.shapes.pop();
            return Err(err);
        }
        Ok(())
    }

    /// Derives mass from `density` and recomputes the inertia tensor.
    pub fn update_mass_and_inertia(&mut self, density: f32) -> PhysicsResult<()> {
        if !density.is_finite() || density <= 0.0 {
            return Err(PhysicsError::invalid_parameter(format!(
                "density must be positive, got {density}"
            )));
        }
        self.recompute_mass(MassPolicy::Density(density))
    }

    /// Sets the total mass and recomputes the inertia tensor from the shapes.
    pub fn set_mass_and_update_inertia(&mut self, mass: f32) -> PhysicsResult<()> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::invalid_parameter(format!(
                "mass must be positive, got {mass}"
            )));
        }
        self.recompute_mass(MassPolicy::Mass(mass))
    }

    fn recompute_mass(&mut self, policy: MassPolicy) -> PhysicsResult<()> {
        let BodyKind::Dynamic(state) = &mut self.kind else {
            return Err(PhysicsError::invalid_parameter(
                "static bodies have no mass properties",
            ));
        };
        let density = match policy {
            MassPolicy::Density(d) => d,
            MassPolicy::Mass(_) => 1.0,
        };
        let parts: Vec<MassProperties> = self
            .shapes
            .iter()
            .filter_map(|shape| {
                shape
                    .geometry()
                    .mass_properties(density)
                    .map(|props| props.transformed(shape.local_pose()))
            })
            .collect();
        let mut props = MassProperties::combine(&parts).ok_or_else(|| {
            PhysicsError::invalid_geometry("dynamic body needs at least one shape with volume")
        })?;
        if let MassPolicy::Mass(target) = policy {
            props = props.with_mass(target);
        }
        let inv_inertia = props.inertia.inverse().ok_or_else(|| {
            PhysicsError::new(ErrorKind::InvalidGeometry, "inertia tensor is singular")
        })?;

        state.mass = props.mass;
        state.inv_mass = 1.0 / props.mass;
        state.center_of_mass = props.center;
        state.inv_inertia_local = inv_inertia;
        state.mass_policy = policy;
        Ok(())
    }

    /// Current pose of the body frame.
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Teleports the body. Only valid between steps.
    pub fn set_pose(&mut self, pose: Pose) -> PhysicsResult<()> {
        self.pose = check_pose(&pose)?;
        self.wake_up();
        Ok(())
    }

    /// The attached shapes.
    pub fn shapes(&self) -> &[Arc<Shape>] {
        &self.shapes
    }

    /// Static or dynamic, with the dynamic state.
    pub fn kind(&self) -> &BodyKind {
        &self.kind
    }

    /// Returns `true` for static bodies.
    pub fn is_static(&self) -> bool {
        matches!(self.kind, BodyKind::Static)
    }

    /// Returns `true` for dynamic bodies.
    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    /// The dynamic state, if any.
    pub fn dynamic(&self) -> Option<&DynamicState> {
        match &self.kind {
            BodyKind::Dynamic(state) => Some(state),
            BodyKind::Static => None,
        }
    }

    fn dynamic_mut(&mut self, operation: &str) -> PhysicsResult<&mut DynamicState> {
        match &mut self.kind {
            BodyKind::Dynamic(state) => Ok(state),
            BodyKind::Static => Err(PhysicsError::invalid_parameter(format!(
                "cannot {operation} on a static body"
            ))),
        }
    }

    /// Mass of the body; zero for static bodies.
    pub fn mass(&self) -> f32 {
        self.dynamic().map_or(0.0, DynamicState::mass)
    }

    /// Linear velocity; zero for static bodies.
    pub fn linear_velocity(&self) -> Vec3 {
        self.dynamic()
            .map_or(Vec3::ZERO, DynamicState::linear_velocity)
    }

    /// Angular velocity; zero for static bodies.
    pub fn angular_velocity(&self) -> Vec3 {
        self.dynamic()
            .map_or(Vec3::ZERO, DynamicState::angular_velocity)
    }

    /// Sets the linear velocity and wakes the body.
    pub fn set_linear_velocity(&mut self, velocity: Vec3) -> PhysicsResult<()> {
        check_vector("linear velocity", velocity)?;
        let state = self.dynamic_mut("set linear velocity")?;
        state.linear_velocity = velocity;
        self.wake_up();
        Ok(())
    }

    /// Sets the angular velocity and wakes the body.
    pub fn set_angular_velocity(&mut self, velocity: Vec3) -> PhysicsResult<()> {
        check_vector("angular velocity", velocity)?;
        let state = self.dynamic_mut("set angular velocity")?;
        state.angular_velocity = velocity;
        self.wake_up();
        Ok(())
    }

    /// Sets the linear damping coefficient.
    pub fn set_linear_damping(&mut self, damping: f32) -> PhysicsResult<()> {
        check_damping(damping)?;
        self.dynamic_mut("set linear damping")?.linear_damping = damping;
        Ok(())
    }

    /// Sets the angular damping coefficient.
    pub fn set_angular_damping(&mut self, damping: f32) -> PhysicsResult<()> {
        check_damping(damping)?;
        self.dynamic_mut("set angular damping")?.angular_damping = damping;
        Ok(())
    }

    /// Centre of mass in world space (the body origin for static bodies).
    pub fn center_of_mass_world(&self) -> Vec3 {
        let local = self
            .dynamic()
            .map_or(Vec3::ZERO, DynamicState::center_of_mass);
        self.pose.transform_point(local)
    }

    /// Inverse inertia tensor in world axes: `R * I⁻¹ * Rᵀ`. Zero for static bodies.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        match self.dynamic() {
            Some(state) => state
                .inv_inertia_local
                .rotated(&Mat3::from_quat(self.pose.orientation)),
            None => Mat3::ZERO,
        }
    }

    /// Union of the shape bounds, or `None` if the body has no shapes or an unbounded one.
    pub fn compute_aabb(&self) -> Option<Aabb> {
        if self.shapes.is_empty() {
            return None;
        }
        self.shapes.iter().try_fold(Aabb::INVALID, |acc, shape| {
            let bounds = shape
                .geometry()
                .compute_aabb(&shape.world_pose(&self.pose))?;
            Some(acc.merge(&bounds))
        })
    }

    /// Returns `true` if any attached shape is an infinite plane.
    pub fn has_unbounded_shape(&self) -> bool {
        self.shapes.iter().any(|s| !s.geometry().is_bounded())
    }

    /// Returns `true` if the body is dynamic and asleep.
    pub fn is_sleeping(&self) -> bool {
        self.dynamic().is_some_and(DynamicState::is_asleep)
    }

    /// Clears the sleep state of a dynamic body.
    pub fn wake_up(&mut self) {
        if let BodyKind::Dynamic(state) = &mut self.kind {
            state.asleep = false;
            state.sleep_frames = 0;
        }
    }

    /// Publishes the result of a completed step. Ignored for static bodies.
    pub fn apply_step(
        &mut self,
        pose: Pose,
        linear_velocity: Vec3,
        angular_velocity: Vec3,
        sleep_frames: u32,
        asleep: bool,
    ) {
        if let BodyKind::Dynamic(state) = &mut self.kind {
            self.pose = pose;
            state.linear_velocity = linear_velocity;
            state.angular_velocity = angular_velocity;
            state.sleep_frames = sleep_frames;
            state.asleep = asleep;
        }
    }
}

fn check_damping(damping: f32) -> PhysicsResult<()> {
    if !damping.is_finite() || damping < 0.0 {
        return Err(PhysicsError::invalid_parameter(format!(
            "damping must be finite and non-negative, got {damping}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Geometry, Material};
    use approx::assert_relative_eq;

    fn cube(h: f32) -> Arc<Shape> {
        Arc::new(Shape::new(Geometry::cube(h), Arc::new(Material::default())).unwrap())
    }

    #[test]
    fn target_mass_sets_mass_and_inertia() {
        let mut body = RigidBody::new_dynamic(Pose::IDENTITY)
            .unwrap()
            .with_shape(cube(2.0))
            .unwrap();
        body.set_mass_and_update_inertia(10.0).unwrap();
        let state = body.dynamic().unwrap();
        assert_relative_eq!(state.mass(), 10.0);
        // I = m/3 * (h² + h²) = 80/3 on every axis.
        assert_relative_eq!(
            state.inverse_inertia_local().cols[0].x,
            3.0 / 80.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn attaching_a_shape_recomputes_mass_with_the_same_policy() {
        let mut body = RigidBody::new_dynamic(Pose::IDENTITY)
            .unwrap()
            .with_shape(cube(1.0))
            .unwrap();
        body.update_mass_and_inertia(2.0).unwrap();
        assert_relative_eq!(body.mass(), 16.0);

        let offset = Shape::new(Geometry::cube(1.0), Arc::new(Material::default()))
            .unwrap()
            .with_local_pose(Pose::from_position(Vec3::new(4.0, 0.0, 0.0)))
            .unwrap();
        body.attach_shape(Arc::new(offset)).unwrap();
        assert_relative_eq!(body.mass(), 32.0);
        assert_relative_eq!(body.dynamic().unwrap().center_of_mass().x, 2.0);
    }

    #[test]
    fn planes_are_static_only() {
        let plane = Arc::new(Shape::new(Geometry::Plane, Arc::new(Material::default())).unwrap());
        let mut dynamic = RigidBody::new_dynamic(Pose::IDENTITY).unwrap();
        assert_eq!(
            dynamic.attach_shape(plane.clone()).unwrap_err().kind(),
            ErrorKind::InvalidGeometry
        );
        assert!(dynamic.shapes().is_empty());

        let ground = RigidBody::new_static(Pose::IDENTITY)
            .unwrap()
            .with_shape(plane)
            .unwrap();
        assert!(ground.has_unbounded_shape());
        assert!(ground.compute_aabb().is_none());
    }

    #[test]
    fn static_bodies_reject_motion() {
        let mut body = RigidBody::new_static(Pose::IDENTITY).unwrap();
        assert_eq!(
            body.set_linear_velocity(Vec3::X).unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
        assert_eq!(body.inverse_inertia_world(), Mat3::ZERO);
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let pose = Pose::from_position(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(RigidBody::new_dynamic(pose).is_err());
        let mut body = RigidBody::new_dynamic(Pose::IDENTITY).unwrap();
        assert!(body
            .set_angular_velocity(Vec3::new(0.0, f32::INFINITY, 0.0))
            .is_err());
        assert!(body.update_mass_and_inertia(0.0).is_err());
    }
}
