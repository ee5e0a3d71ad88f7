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

//! Sequential impulse contact solver.
//!
//! Each contact point carries a non-penetration constraint along the normal
//! and two friction constraints along orthogonal tangents. Impulses are
//! accumulated per point and clamped (normal impulse non-negative, friction
//! inside the Coulomb cone) over a fixed number of iterations.
//!
//! The accumulated impulses of a solved constraint can be exported as
//! [`CachedImpulse`]s and fed back the next step. Points are matched by their
//! anchors in both body frames, and the matched impulses are applied before the
//! first iteration, so resting contacts start the step already balanced.

use crate::math::{tangent_basis, Vec3};

use super::contact::{Contact, ContactManifold};
use super::handle::BodyHandle;
use super::material::CombinedMaterial;
use super::state::BodyState;

/// Tangential speed below which a contact counts as sticking (static friction applies).
const STICKING_SPEED: f32 = 0.1;

/// Largest anchor drift, in either body frame, for a cached impulse to be reused.
const WARM_START_DISTANCE: f32 = 0.05;

/// Tuning of the contact solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Velocity iterations per step.
    pub iterations: u32,
    /// Fraction of the penetration corrected per step (Baumgarte factor).
    pub baumgarte: f32,
    /// Penetration tolerated without correction.
    pub slop: f32,
    /// Approach speed below which restitution is ignored.
    pub restitution_threshold: f32,
    /// Cap on the separating speed introduced by position correction.
    pub max_depenetration_velocity: f32,
    /// Whether cached impulses from the previous step seed the solve.
    pub warm_starting: bool,
    /// Scale applied to cached impulses, in `[0, 1]`.
    pub warm_start_factor: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            iterations: 8,
            baumgarte: 0.2,
            slop: 0.01,
            restitution_threshold: 0.5,
            max_depenetration_velocity: 10.0,
            warm_starting: true,
            warm_start_factor: 1.0,
        }
    }
}

/// The accumulated impulses of one solved contact point, kept for the next step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedImpulse {
    /// Contact point in the frame of the first body.
    pub local_a: Vec3,
    /// Contact point in the frame of the second body.
    pub local_b: Vec3,
    /// Accumulated normal impulse.
    pub normal_impulse: f32,
    /// Accumulated friction impulse, world axes.
    pub tangent_impulse: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct ConstraintPoint {
    position: Vec3,
    depth: f32,
    local_a: Vec3,
    local_b: Vec3,
    r_a: Vec3,
    r_b: Vec3,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    /// Minimum normal relative velocity the solver drives towards.
    target_velocity: f32,
    /// Friction coefficient chosen from the sliding state at preparation time.
    friction: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

/// A prepared contact manifold between two entries of the solver's state slice.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    body_a: usize,
    body_b: usize,
    normal: Vec3,
    tangents: [Vec3; 2],
    material: CombinedMaterial,
    points: Vec<ConstraintPoint>,
}

#[inline]
fn effective_mass(a: &BodyState, b: &BodyState, r_a: Vec3, r_b: Vec3, axis: Vec3) -> f32 {
    let ang_a = (a.inv_inertia_world * r_a.cross(axis)).cross(r_a);
    let ang_b = (b.inv_inertia_world * r_b.cross(axis)).cross(r_b);
    let k = a.inv_mass + b.inv_mass + axis.dot(ang_a + ang_b);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

impl ContactConstraint {
    /// Index of the first body in the state slice.
    pub fn body_a(&self) -> usize {
        self.body_a
    }

    /// Index of the second body in the state slice.
    pub fn body_b(&self) -> usize {
        self.body_b
    }

    /// Contact normal, from the first body towards the second.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Number of contact points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the constraint has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of the accumulated normal impulses.
    pub fn total_normal_impulse(&self) -> f32 {
        self.points.iter().map(|p| p.normal_impulse).sum()
    }

    /// The accumulated impulses of every point, for warm starting the next step.
    pub fn cached_impulses(&self) -> Vec<CachedImpulse> {
        self.points
            .iter()
            .map(|p| CachedImpulse {
                local_a: p.local_a,
                local_b: p.local_b,
                normal_impulse: p.normal_impulse,
                tangent_impulse: self.tangents[0] * p.tangent_impulse[0]
                    + self.tangents[1] * p.tangent_impulse[1],
            })
            .collect()
    }

    /// Converts the solved points into published contacts.
    pub fn contacts(
        &self,
        handle_a: BodyHandle,
        handle_b: BodyHandle,
    ) -> impl Iterator<Item = Contact> + '_ {
        self.points.iter().map(move |p| Contact {
            body_a: handle_a,
            body_b: handle_b,
            point: p.position,
            normal: self.normal,
            depth: p.depth,
            static_friction: self.material.static_friction,
            dynamic_friction: self.material.dynamic_friction,
            restitution: self.material.restitution,
            normal_impulse: p.normal_impulse,
        })
    }
}

/// Iterative impulse solver over a slice of [`BodyState`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactSolver {
    settings: SolverSettings,
}

impl ContactSolver {
    /// Creates a solver with the given settings.
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    /// The solver settings.
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Builds the constraint for `manifold` between `states[body_a]` and `states[body_b]`.
    ///
    /// Velocity targets (position correction, restitution, speculative
    /// approach) are fixed here from the velocities at the start of the solve.
    pub fn prepare(
        &self,
        body_a: usize,
        body_b: usize,
        manifold: &ContactManifold,
        material: CombinedMaterial,
        states: &[BodyState],
        dt: f32,
    ) -> ContactConstraint {
        let a = &states[body_a];
        let b = &states[body_b];
        let normal = manifold.normal;
        let (t1, t2) = tangent_basis(normal);
        let center_a = a.center();
        let center_b = b.center();
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };

        let points = manifold
            .points
            .iter()
            .map(|cp| {
                let r_a = cp.position - center_a;
                let r_b = cp.position - center_b;
                let relative = b.velocity_at(r_b) - a.velocity_at(r_a);
                let normal_speed = relative.dot(normal);

                let target_velocity = if cp.depth < 0.0 {
                    // Speculative: allow closing the gap this step, no more.
                    cp.depth * inv_dt
                } else {
                    let correction = (self.settings.baumgarte
                        * inv_dt
                        * (cp.depth - self.settings.slop).max(0.0))
                    .min(self.settings.max_depenetration_velocity);
                    if normal_speed < -self.settings.restitution_threshold {
                        correction.max(-material.restitution * normal_speed)
                    } else {
                        correction
                    }
                };

                let tangential_speed = (relative - normal * normal_speed).length();
                let friction = if tangential_speed < STICKING_SPEED {
                    material.static_friction
                } else {
                    material.dynamic_friction
                };

                ConstraintPoint {
                    position: cp.position,
                    depth: cp.depth,
                    local_a: a.pose.inverse_transform_point(cp.position),
                    local_b: b.pose.inverse_transform_point(cp.position),
                    r_a,
                    r_b,
                    normal_mass: effective_mass(a, b, r_a, r_b, normal),
                    tangent_mass: [
                        effective_mass(a, b, r_a, r_b, t1),
                        effective_mass(a, b, r_a, r_b, t2),
                    ],
                    target_velocity,
                    friction,
                    normal_impulse: 0.0,
                    tangent_impulse: [0.0; 2],
                }
            })
            .collect();

        ContactConstraint {
            body_a,
            body_b,
            normal,
            tangents: [t1, t2],
            material,
            points,
        }
    }

    /// Seeds `constraint` with the impulses cached for the same pair last step.
    ///
    /// Each point takes the impulse of the closest cached point whose anchors
    /// moved less than a few centimetres in both body frames. Unmatched points
    /// start from zero. Does nothing when warm starting is disabled.
    pub fn warm_start(&self, constraint: &mut ContactConstraint, cached: &[CachedImpulse]) {
        if !self.settings.warm_starting || cached.is_empty() {
            return;
        }
        let factor = self.settings.warm_start_factor.clamp(0.0, 1.0);
        let limit = WARM_START_DISTANCE * WARM_START_DISTANCE;
        let tangents = constraint.tangents;
        for point in &mut constraint.points {
            let closest = cached
                .iter()
                .map(|c| {
                    let drift_a = (c.local_a - point.local_a).length_squared();
                    let drift_b = (c.local_b - point.local_b).length_squared();
                    (drift_a.max(drift_b), c)
                })
                .filter(|(drift, _)| *drift <= limit)
                .min_by(|x, y| x.0.total_cmp(&y.0));
            if let Some((_, c)) = closest {
                point.normal_impulse = c.normal_impulse.max(0.0) * factor;
                point.tangent_impulse = [
                    c.tangent_impulse.dot(tangents[0]) * factor,
                    c.tangent_impulse.dot(tangents[1]) * factor,
                ];
            }
        }
    }

    /// Applies the seeded impulses, then runs the configured number of
    /// velocity iterations.
    pub fn solve(&self, states: &mut [BodyState], constraints: &mut [ContactConstraint]) {
        for constraint in constraints.iter() {
            Self::apply_accumulated(states, constraint);
        }
        for _ in 0..self.settings.iterations {
            for constraint in constraints.iter_mut() {
                Self::solve_constraint(states, constraint);
            }
        }
    }

    fn apply_accumulated(states: &mut [BodyState], c: &ContactConstraint) {
        let mut a = states[c.body_a];
        let mut b = states[c.body_b];
        for point in &c.points {
            let impulse = c.normal * point.normal_impulse
                + c.tangents[0] * point.tangent_impulse[0]
                + c.tangents[1] * point.tangent_impulse[1];
            if impulse == Vec3::ZERO {
                continue;
            }
            a.apply_impulse(-impulse, point.r_a);
            b.apply_impulse(impulse, point.r_b);
        }
        states[c.body_a] = a;
        states[c.body_b] = b;
    }

    fn solve_constraint(states: &mut [BodyState], c: &mut ContactConstraint) {
        let mut a = states[c.body_a];
        let mut b = states[c.body_b];

        for point in &mut c.points {
            // Non-penetration.
            let relative = b.velocity_at(point.r_b) - a.velocity_at(point.r_a);
            let lambda = (point.target_velocity - relative.dot(c.normal)) * point.normal_mass;
            let accumulated = (point.normal_impulse + lambda).max(0.0);
            let delta = accumulated - point.normal_impulse;
            point.normal_impulse = accumulated;
            let impulse = c.normal * delta;
            a.apply_impulse(-impulse, point.r_a);
            b.apply_impulse(impulse, point.r_b);

            // Friction, bounded by the current normal impulse.
            let limit = point.friction * point.normal_impulse;
            for (k, tangent) in c.tangents.iter().enumerate() {
                let relative = b.velocity_at(point.r_b) - a.velocity_at(point.r_a);
                let lambda = -relative.dot(*tangent) * point.tangent_mass[k];
                let accumulated = (point.tangent_impulse[k] + lambda).clamp(-limit, limit);
                let delta = accumulated - point.tangent_impulse[k];
                point.tangent_impulse[k] = accumulated;
                let impulse = *tangent * delta;
                a.apply_impulse(-impulse, point.r_a);
                b.apply_impulse(impulse, point.r_b);
            }
        }

        states[c.body_a] = a;
        states[c.body_b] = b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat3, Pose};
    use approx::assert_relative_eq;

    fn ball(x: f32, vx: f32, mass: f32) -> BodyState {
        let mut state = BodyState::fixed(Pose::from_position(Vec3::new(x, 0.0, 0.0)));
        state.inv_mass = 1.0 / mass;
        state.inv_inertia_local = Mat3::IDENTITY * (1.0 / mass);
        state.refresh_world_inertia();
        state.linear_velocity = Vec3::new(vx, 0.0, 0.0);
        state
    }

    fn head_on() -> ContactManifold {
        ContactManifold::single(Vec3::X, Vec3::ZERO, 0.0)
    }

    fn elastic() -> CombinedMaterial {
        CombinedMaterial {
            static_friction: 0.0,
            dynamic_friction: 0.0,
            restitution: 1.0,
        }
    }

    #[test]
    fn elastic_collision_conserves_momentum() {
        let mut states = vec![ball(-1.0, 4.0, 1.0), ball(1.0, -2.0, 3.0)];
        let before = states[0].momentum() + states[1].momentum();
        let solver = ContactSolver::default();
        let mut constraints = vec![solver.prepare(0, 1, &head_on(), elastic(), &states, 1.0 / 60.0)];
        solver.solve(&mut states, &mut constraints);
        let after = states[0].momentum() + states[1].momentum();
        assert_relative_eq!(before.x, after.x, epsilon = 1e-4);
        // Restitution 1 reverses the approach speed of 6.
        let separating = states[1].linear_velocity.x - states[0].linear_velocity.x;
        assert_relative_eq!(separating, 6.0, epsilon = 1e-3);
    }

    #[test]
    fn static_body_absorbs_impulse_without_moving() {
        let mut states = vec![BodyState::fixed(Pose::IDENTITY), ball(1.0, -3.0, 2.0)];
        let solver = ContactSolver::default();
        let material = CombinedMaterial {
            restitution: 0.0,
            ..elastic()
        };
        let mut constraints = vec![solver.prepare(0, 1, &head_on(), material, &states, 1.0 / 60.0)];
        solver.solve(&mut states, &mut constraints);
        assert_eq!(states[0].linear_velocity, Vec3::ZERO);
        assert_relative_eq!(states[1].linear_velocity.x, 0.0, epsilon = 1e-4);
        assert!(constraints[0].total_normal_impulse() > 0.0);
    }

    #[test]
    fn separating_bodies_receive_no_impulse() {
        let mut states = vec![ball(-1.0, -1.0, 1.0), ball(1.0, 1.0, 1.0)];
        let solver = ContactSolver::default();
        let mut constraints = vec![solver.prepare(0, 1, &head_on(), elastic(), &states, 1.0 / 60.0)];
        solver.solve(&mut states, &mut constraints);
        assert_eq!(constraints[0].total_normal_impulse(), 0.0);
        assert_eq!(states[0].linear_velocity.x, -1.0);
    }

    #[test]
    fn friction_stops_sliding_within_cone() {
        // A box-like body resting on a static floor, sliding slowly along x.
        let floor = BodyState::fixed(Pose::IDENTITY);
        let mut slider = ball(0.0, 0.0, 1.0);
        slider.pose.position = Vec3::new(0.0, 1.0, 0.0);
        slider.linear_velocity = Vec3::new(0.05, -1.0, 0.0);
        let mut states = vec![floor, slider];
        let manifold = ContactManifold::single(Vec3::Y, Vec3::ZERO, 0.0);
        let material = CombinedMaterial {
            static_friction: 1.0,
            dynamic_friction: 1.0,
            restitution: 0.0,
        };
        let solver = ContactSolver::default();
        let mut constraints = vec![solver.prepare(0, 1, &manifold, material, &states, 1.0 / 60.0)];
        solver.solve(&mut states, &mut constraints);
        let contact = states[1].velocity_at(Vec3::new(0.0, -1.0, 0.0));
        assert!(contact.x.abs() < 1e-3);
        assert!(contact.y.abs() < 1e-3);
    }

    fn resting_on_floor() -> (Vec<BodyState>, ContactManifold) {
        let floor = BodyState::fixed(Pose::IDENTITY);
        let mut block = ball(0.0, 0.0, 2.0);
        block.pose.position = Vec3::new(0.0, 1.0, 0.0);
        block.linear_velocity = Vec3::new(0.0, -0.5, 0.0);
        let manifold = ContactManifold::single(Vec3::Y, Vec3::ZERO, 0.0);
        (vec![floor, block], manifold)
    }

    fn no_iterations() -> ContactSolver {
        ContactSolver::new(SolverSettings {
            iterations: 0,
            ..SolverSettings::default()
        })
    }

    fn cached_support(local_b: Vec3) -> CachedImpulse {
        CachedImpulse {
            local_a: Vec3::ZERO,
            local_b,
            normal_impulse: 1.0,
            tangent_impulse: Vec3::ZERO,
        }
    }

    #[test]
    fn warm_start_reapplies_the_cached_impulse() {
        let (mut states, manifold) = resting_on_floor();
        let solver = no_iterations();
        let mut constraint = solver.prepare(0, 1, &manifold, elastic(), &states, 1.0 / 60.0);
        // Mass 2 at -0.5 m/s needs exactly 1 N·s to stop.
        solver.warm_start(&mut constraint, &[cached_support(Vec3::new(0.0, -1.0, 0.0))]);
        assert_relative_eq!(constraint.total_normal_impulse(), 1.0);

        solver.solve(&mut states, std::slice::from_mut(&mut constraint));
        assert_relative_eq!(states[1].linear_velocity.y, 0.0, epsilon = 1e-6);
        assert_eq!(states[0].linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn warm_start_ignores_points_that_moved_away() {
        let (mut states, manifold) = resting_on_floor();
        let solver = no_iterations();
        let mut constraint = solver.prepare(0, 1, &manifold, elastic(), &states, 1.0 / 60.0);
        solver.warm_start(&mut constraint, &[cached_support(Vec3::new(0.5, -1.0, 0.0))]);
        assert_eq!(constraint.total_normal_impulse(), 0.0);

        solver.solve(&mut states, std::slice::from_mut(&mut constraint));
        assert_relative_eq!(states[1].linear_velocity.y, -0.5);
    }

    #[test]
    fn warm_start_can_be_disabled() {
        let (states, manifold) = resting_on_floor();
        let solver = ContactSolver::new(SolverSettings {
            warm_starting: false,
            ..SolverSettings::default()
        });
        let mut constraint = solver.prepare(0, 1, &manifold, elastic(), &states, 1.0 / 60.0);
        solver.warm_start(&mut constraint, &[cached_support(Vec3::new(0.0, -1.0, 0.0))]);
        assert_eq!(constraint.total_normal_impulse(), 0.0);
    }

    #[test]
    fn solved_impulses_round_trip_through_the_cache() {
        let (mut states, manifold) = resting_on_floor();
        let solver = ContactSolver::default();
        let material = CombinedMaterial {
            restitution: 0.0,
            ..elastic()
        };
        let mut constraints = vec![solver.prepare(0, 1, &manifold, material, &states, 1.0 / 60.0)];
        solver.solve(&mut states, &mut constraints);
        let cached = constraints[0].cached_impulses();
        assert_eq!(cached.len(), 1);
        assert_relative_eq!(cached[0].local_b.y, -1.0, epsilon = 1e-6);
        assert_relative_eq!(cached[0].normal_impulse, 1.0, epsilon = 1e-4);

        let mut next = solver.prepare(0, 1, &manifold, material, &states, 1.0 / 60.0);
        solver.warm_start(&mut next, &cached);
        assert_relative_eq!(next.total_normal_impulse(), cached[0].normal_impulse);
    }
}
