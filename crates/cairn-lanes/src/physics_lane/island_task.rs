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

use std::sync::Arc;

use cairn_core::error::{PhysicsError, PhysicsResult};
use cairn_core::math::{Pose, Vec3};
use cairn_core::physics::{
    Arena, BodyHandle, BodyState, CachedImpulse, Contact, ContactConstraint, ContactSolver,
    Integrator, NarrowPhase, RigidBody, Sanitized, Shape, SolverSettings,
};
use cairn_core::ErrorKind;

use super::contact_cache::{ContactCache, ManifoldKey};
use super::island_lane::Island;

/// Sleep thresholds for islands at rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepSettings {
    /// Whether islands may fall asleep at all.
    pub enabled: bool,
    /// Linear speed below which a body counts as resting.
    pub linear_threshold: f32,
    /// Angular speed below which a body counts as resting.
    pub angular_threshold: f32,
    /// Consecutive resting steps before an island sleeps.
    pub frames: u32,
}

impl Default for SleepSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            linear_threshold: 0.05,
            angular_threshold: 0.05,
            frames: 30,
        }
    }
}

/// Everything a worker needs to advance an island by one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSettings {
    /// Time step in seconds.
    pub dt: f32,
    /// Gravity and angular velocity clamp.
    pub integrator: Integrator,
    /// Iteration count and position correction.
    pub solver: SolverSettings,
    /// Speculative contact margin.
    pub narrow_phase: NarrowPhase,
    /// Sleep thresholds.
    pub sleep: SleepSettings,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            integrator: Integrator::default(),
            solver: SolverSettings::default(),
            narrow_phase: NarrowPhase::default(),
            sleep: SleepSettings::default(),
        }
    }
}

/// A body copied out of the scene for the duration of a step.
#[derive(Debug, Clone)]
pub struct IslandBody {
    /// The scene body this copy belongs to.
    pub handle: BodyHandle,
    /// Working motion state.
    pub state: BodyState,
    /// Collision shapes, shared with the scene.
    pub shapes: Vec<Arc<Shape>>,
    /// Consecutive resting steps so far.
    pub sleep_frames: u32,
    /// Whether the body was asleep at the start of the step.
    pub asleep: bool,
}

impl IslandBody {
    fn capture(handle: BodyHandle, body: &RigidBody) -> Self {
        let dynamic = body.dynamic();
        Self {
            handle,
            state: BodyState::from_body(body),
            shapes: body.shapes().to_vec(),
            sleep_frames: dynamic.map_or(0, |d| d.sleep_frames()),
            asleep: dynamic.is_some_and(|d| d.is_asleep()),
        }
    }
}

/// The new state of one dynamic body after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyUpdate {
    /// The body.
    pub handle: BodyHandle,
    /// New pose.
    pub pose: Pose,
    /// New linear velocity.
    pub linear_velocity: Vec3,
    /// New angular velocity.
    pub angular_velocity: Vec3,
    /// Consecutive resting steps.
    pub sleep_frames: u32,
    /// Whether the body is now asleep.
    pub asleep: bool,
}

/// The result of solving one island.
#[derive(Debug, Clone, Default)]
pub struct IslandOutcome {
    /// One update per dynamic member, in member order.
    pub updates: Vec<BodyUpdate>,
    /// Contacts resolved this step.
    pub contacts: Vec<Contact>,
    /// Bodies whose velocities were non-finite and reset to zero.
    pub anomalies: Vec<BodyHandle>,
    /// Accumulated impulses of every manifold, to warm start the next step.
    pub impulses: Vec<(ManifoldKey, Vec<CachedImpulse>)>,
}

/// A self-contained unit of step work: narrow phase, solve and integration
/// for one island.
///
/// The task owns copies of everything it reads, so it can run on any thread
/// while the scene stays untouched.
#[derive(Debug, Clone)]
pub struct IslandTask {
    bodies: Vec<IslandBody>,
    dynamic_count: usize,
    pairs: Vec<(usize, usize)>,
    warm: ContactCache,
    settings: StepSettings,
}

impl IslandTask {
    /// Captures `island` from `bodies`, along with the impulses `cache` holds
    /// for its pairs.
    ///
    /// Fails with `UnknownHandle` if a member is no longer in the arena.
    pub fn new(
        island: &Island,
        bodies: &Arena<RigidBody>,
        cache: &ContactCache,
        settings: StepSettings,
    ) -> PhysicsResult<Self> {
        let lookup = |handle: BodyHandle| {
            bodies.get(handle).ok_or_else(|| {
                PhysicsError::new(ErrorKind::UnknownHandle, format!("{handle} is not in the scene"))
            })
        };

        let mut members = Vec::with_capacity(island.bodies.len() + island.statics.len());
        for &handle in island.bodies.iter().chain(&island.statics) {
            members.push(IslandBody::capture(handle, lookup(handle)?));
        }

        let position = |handle: BodyHandle| members.iter().position(|m| m.handle == handle);
        let mut pairs = Vec::with_capacity(island.pairs.len());
        for pair in &island.pairs {
            match (position(pair.body_a), position(pair.body_b)) {
                (Some(a), Some(b)) => pairs.push((a, b)),
                _ => {
                    return Err(PhysicsError::new(
                        ErrorKind::UnknownHandle,
                        format!("pair {}-{} is not inside the island", pair.body_a, pair.body_b),
                    ))
                }
            }
        }

        let mut warm = ContactCache::new();
        if !cache.is_empty() {
            for &(a, b) in &pairs {
                for key in Self::manifold_keys(&members[a], &members[b]) {
                    let impulses = cache.get(&key);
                    if !impulses.is_empty() {
                        warm.insert(key, impulses.to_vec());
                    }
                }
            }
        }

        Ok(Self {
            dynamic_count: island.bodies.len(),
            bodies: members,
            pairs,
            warm,
            settings,
        })
    }

    /// Number of dynamic bodies in the task.
    pub fn dynamic_count(&self) -> usize {
        self.dynamic_count
    }

    /// Number of candidate pairs in the task.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    fn manifold_keys<'a>(
        a: &'a IslandBody,
        b: &'a IslandBody,
    ) -> impl Iterator<Item = ManifoldKey> + 'a {
        (0..a.shapes.len() as u32).flat_map(move |shape_a| {
            (0..b.shapes.len() as u32).map(move |shape_b| ManifoldKey {
                body_a: a.handle,
                body_b: b.handle,
                shape_a,
                shape_b,
            })
        })
    }

    /// Runs the step: velocity integration, contact generation, solve,
    /// sanitization, position integration and sleep evaluation.
    pub fn run(mut self) -> IslandOutcome {
        let settings = self.settings;
        let dt = settings.dt;
        let dynamic = 0..self.dynamic_count;

        // Any awake member wakes the whole island.
        if self.bodies[dynamic.clone()].iter().any(|b| !b.asleep) {
            for body in &mut self.bodies[dynamic.clone()] {
                if body.asleep {
                    body.asleep = false;
                    body.sleep_frames = 0;
                }
            }
        } else {
            return self.finish(Vec::new(), Vec::new(), Vec::new());
        }

        let mut states: Vec<BodyState> = self.bodies.iter().map(|b| b.state).collect();
        for state in &mut states[dynamic.clone()] {
            settings.integrator.integrate_velocity(state, dt);
        }

        let solver = ContactSolver::new(settings.solver);
        let mut constraints: Vec<ContactConstraint> = Vec::new();
        let mut keys: Vec<ManifoldKey> = Vec::new();
        for &(a, b) in &self.pairs {
            let (body_a, body_b) = (&self.bodies[a], &self.bodies[b]);
            for (index_a, shape_a) in body_a.shapes.iter().enumerate() {
                let pose_a = shape_a.world_pose(&states[a].pose);
                for (index_b, shape_b) in body_b.shapes.iter().enumerate() {
                    let pose_b = shape_b.world_pose(&states[b].pose);
                    let Some(manifold) = settings.narrow_phase.collide(
                        shape_a.geometry(),
                        &pose_a,
                        shape_b.geometry(),
                        &pose_b,
                    ) else {
                        continue;
                    };
                    let material = shape_a.material().combine(shape_b.material());
                    let key = ManifoldKey {
                        body_a: body_a.handle,
                        body_b: body_b.handle,
                        shape_a: index_a as u32,
                        shape_b: index_b as u32,
                    };
                    let mut constraint = solver.prepare(a, b, &manifold, material, &states, dt);
                    solver.warm_start(&mut constraint, self.warm.get(&key));
                    constraints.push(constraint);
                    keys.push(key);
                }
            }
        }
        solver.solve(&mut states, &mut constraints);

        let mut anomalies = Vec::new();
        for i in dynamic.clone() {
            if settings.integrator.sanitize(&mut states[i]) == Sanitized::Reset {
                anomalies.push(self.bodies[i].handle);
            }
            settings.integrator.integrate_position(&mut states[i], dt);
        }

        self.evaluate_sleep(&mut states);
        for (body, state) in self.bodies.iter_mut().zip(&states) {
            body.state = *state;
        }

        let contacts: Vec<Contact> = constraints
            .iter()
            .flat_map(|c| {
                c.contacts(
                    self.bodies[c.body_a()].handle,
                    self.bodies[c.body_b()].handle,
                )
            })
            .collect();
        let impulses = keys
            .into_iter()
            .zip(&constraints)
            .map(|(key, c)| (key, c.cached_impulses()))
            .collect();
        self.finish(contacts, anomalies, impulses)
    }

    fn evaluate_sleep(&mut self, states: &mut [BodyState]) {
        let sleep = self.settings.sleep;
        if !sleep.enabled {
            return;
        }
        let mut all_resting = true;
        for (body, state) in self.bodies[..self.dynamic_count].iter_mut().zip(states.iter()) {
            let resting = state.linear_velocity.length() < sleep.linear_threshold
                && state.angular_velocity.length() < sleep.angular_threshold;
            body.sleep_frames = if resting { body.sleep_frames + 1 } else { 0 };
            all_resting &= body.sleep_frames >= sleep.frames;
        }
        if all_resting {
            for (body, state) in self.bodies[..self.dynamic_count]
                .iter_mut()
                .zip(states.iter_mut())
            {
                body.asleep = true;
                state.linear_velocity = Vec3::ZERO;
                state.angular_velocity = Vec3::ZERO;
            }
        }
    }

    fn finish(
        self,
        contacts: Vec<Contact>,
        anomalies: Vec<BodyHandle>,
        impulses: Vec<(ManifoldKey, Vec<CachedImpulse>)>,
    ) -> IslandOutcome {
        let updates = self.bodies[..self.dynamic_count]
            .iter()
            .map(|b| BodyUpdate {
                handle: b.handle,
                pose: b.state.pose,
                linear_velocity: b.state.linear_velocity,
                angular_velocity: b.state.angular_velocity,
                sleep_frames: b.sleep_frames,
                asleep: b.asleep,
            })
            .collect();
        IslandOutcome {
            updates,
            contacts,
            anomalies,
            impulses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics_lane::{BroadphaseLane, IslandLane};
    use approx::assert_relative_eq;
    use cairn_core::math::Quaternion;
    use cairn_core::physics::{Geometry, Material};

    fn ground(arena: &mut Arena<RigidBody>) -> BodyHandle {
        let material = Arc::new(Material::new(0.5, 0.5, 0.0).unwrap());
        let pose = Pose::new(Vec3::ZERO, Quaternion::from_rotation_arc(Vec3::X, Vec3::Y));
        let body = RigidBody::new_static(pose)
            .unwrap()
            .with_shape(Arc::new(Shape::new(Geometry::Plane, material).unwrap()))
            .unwrap();
        arena.insert(body)
    }

    fn cube(arena: &mut Arena<RigidBody>, at: Vec3) -> BodyHandle {
        let material = Arc::new(Material::new(0.5, 0.5, 0.0).unwrap());
        let mut body = RigidBody::new_dynamic(Pose::from_position(at))
            .unwrap()
            .with_shape(Arc::new(Shape::new(Geometry::cube(0.5), material).unwrap()))
            .unwrap();
        body.set_mass_and_update_inertia(1.0).unwrap();
        arena.insert(body)
    }

    fn step(
        arena: &mut Arena<RigidBody>,
        lane: &mut BroadphaseLane,
        cache: &mut ContactCache,
        settings: StepSettings,
    ) -> Vec<IslandOutcome> {
        let pairs = lane.sync(arena, settings.dt);
        let islands = IslandLane::new().build(arena, &pairs);
        let outcomes: Vec<IslandOutcome> = islands
            .iter()
            .map(|island| IslandTask::new(island, arena, cache, settings).unwrap().run())
            .collect();
        cache.clear();
        for outcome in &outcomes {
            cache.extend(outcome.impulses.iter().cloned());
        }
        for outcome in &outcomes {
            for u in &outcome.updates {
                arena.get_mut(u.handle).unwrap().apply_step(
                    u.pose,
                    u.linear_velocity,
                    u.angular_velocity,
                    u.sleep_frames,
                    u.asleep,
                );
            }
        }
        outcomes
    }

    #[test]
    fn free_body_falls_under_gravity() {
        let mut arena = Arena::new();
        let body = cube(&mut arena, Vec3::new(0.0, 100.0, 0.0));
        let mut lane = BroadphaseLane::default();
        let mut cache = ContactCache::new();
        let settings = StepSettings::default();
        for _ in 0..60 {
            step(&mut arena, &mut lane, &mut cache, settings);
        }
        let v = arena.get(body).unwrap().linear_velocity();
        assert_relative_eq!(v.y, -9.81, max_relative = 1e-4);
    }

    #[test]
    fn box_comes_to_rest_on_ground() {
        let mut arena = Arena::new();
        ground(&mut arena);
        let body = cube(&mut arena, Vec3::new(0.0, 0.6, 0.0));
        let mut lane = BroadphaseLane::default();
        let mut cache = ContactCache::new();
        let settings = StepSettings::default();
        let mut last = Vec::new();
        for _ in 0..180 {
            last = step(&mut arena, &mut lane, &mut cache, settings);
        }
        let y = arena.get(body).unwrap().pose().position.y;
        assert!((y - 0.5).abs() < 0.05, "box settled at {y}");
        assert!(arena.get(body).unwrap().linear_velocity().length() < 0.1);
        assert!(!last[0].contacts.is_empty());
    }

    #[test]
    fn nan_velocity_is_reset_and_reported() {
        let mut arena = Arena::new();
        let body = cube(&mut arena, Vec3::new(0.0, 10.0, 0.0));
        arena.get_mut(body).unwrap().apply_step(
            Pose::from_position(Vec3::new(0.0, 10.0, 0.0)),
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::ZERO,
            0,
            false,
        );
        let mut lane = BroadphaseLane::default();
        let mut cache = ContactCache::new();
        let outcomes = step(&mut arena, &mut lane, &mut cache, StepSettings::default());
        assert_eq!(outcomes[0].anomalies, vec![body]);
        let b = arena.get(body).unwrap();
        assert!(b.linear_velocity().is_finite());
        assert!(b.pose().is_finite());
    }

    #[test]
    fn resting_island_falls_asleep_and_stops_moving() {
        let mut arena = Arena::new();
        ground(&mut arena);
        let body = cube(&mut arena, Vec3::new(0.0, 0.5, 0.0));
        let mut lane = BroadphaseLane::default();
        let mut cache = ContactCache::new();
        let settings = StepSettings {
            sleep: SleepSettings {
                enabled: true,
                linear_threshold: 0.2,
                angular_threshold: 0.2,
                frames: 10,
            },
            ..StepSettings::default()
        };
        for _ in 0..120 {
            step(&mut arena, &mut lane, &mut cache, settings);
        }
        let b = arena.get(body).unwrap();
        assert!(b.is_sleeping());
        let before = *b.pose();
        step(&mut arena, &mut lane, &mut cache, settings);
        assert_eq!(*arena.get(body).unwrap().pose(), before);
    }

    #[test]
    fn stale_members_are_rejected() {
        let mut arena = Arena::new();
        let body = cube(&mut arena, Vec3::ZERO);
        let island = Island {
            bodies: vec![body],
            ..Island::default()
        };
        arena.remove(body);
        let err = IslandTask::new(&island, &arena, &ContactCache::new(), StepSettings::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownHandle);
    }

    #[test]
    fn cached_impulses_hold_a_resting_box_from_the_first_iteration() {
        let mut arena = Arena::new();
        let floor = ground(&mut arena);
        let body = cube(&mut arena, Vec3::new(0.0, 0.5, 0.0));
        let mut lane = BroadphaseLane::default();
        let mut cache = ContactCache::new();
        let settings = StepSettings::default();
        for _ in 0..30 {
            step(&mut arena, &mut lane, &mut cache, settings);
        }
        let key = ManifoldKey {
            body_a: floor,
            body_b: body,
            shape_a: 0,
            shape_b: 0,
        };
        assert_eq!(cache.get(&key).len(), 4);

        // Without iterations only the cached impulses act against gravity.
        let frozen = StepSettings {
            solver: SolverSettings {
                iterations: 0,
                ..SolverSettings::default()
            },
            ..settings
        };
        let pairs = lane.sync(&arena, frozen.dt);
        let islands = IslandLane::new().build(&arena, &pairs);
        let run = |cache: &ContactCache| {
            let outcome = IslandTask::new(&islands[0], &arena, cache, frozen).unwrap().run();
            outcome.updates[0].linear_velocity.y
        };
        let cold = run(&ContactCache::new());
        let warm = run(&cache);
        assert_relative_eq!(cold, -9.81 * frozen.dt, max_relative = 0.05);
        assert!(warm.abs() < 0.1 * cold.abs(), "warm {warm} vs cold {cold}");
    }
}
