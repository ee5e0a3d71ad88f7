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

//! The simulation scene and its two-phase step API.

use std::sync::Arc;
use std::time::Instant;

use cairn_core::error::{ErrorKind, PhysicsError, PhysicsResult};
use cairn_core::math::{Pose, Vec3};
use cairn_core::physics::{Arena, BodyHandle, BodyKind, Contact, RigidBody};
use cairn_core::telemetry::{BodyKindTag, BodySnapshot, SceneSnapshot};
use cairn_infra::{PendingBatch, WorkDispatcher};
use cairn_lanes::{
    BroadphaseLane, ContactCache, IslandLane, IslandOutcome, IslandTask, StepSettings,
};
use cairn_telemetry::{SimulationStats, TelemetryService};

/// Island tasks queued per worker; more than one evens out uneven islands.
const JOBS_PER_WORKER: usize = 4;

struct InFlightStep {
    batch: PendingBatch<Vec<IslandOutcome>>,
    dt: f32,
    started: Instant,
    island_count: usize,
}

/// Owns every body and advances them in fixed steps.
///
/// A step is split in two calls. [`Scene::simulate`] runs the broad phase and
/// island partitioning on the calling thread, then hands one task per island to
/// the [`WorkDispatcher`]. [`Scene::fetch_results`] waits for those tasks and
/// publishes the new poses. Between the two calls the scene rejects every
/// mutation with `StepInProgress`; reads return the state of the last
/// published step.
pub struct Scene {
    bodies: Arena<RigidBody>,
    broadphase: BroadphaseLane,
    islands: IslandLane,
    settings: StepSettings,
    in_flight: Option<InFlightStep>,
    contacts: Vec<Contact>,
    contact_cache: ContactCache,
    step_count: u64,
    time: f64,
    stats: SimulationStats,
    telemetry: Arc<TelemetryService>,
    dispatcher: Arc<WorkDispatcher>,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("bodies", &self.bodies.len())
            .field("step_count", &self.step_count)
            .field("step_in_progress", &self.in_flight.is_some())
            .finish()
    }
}

impl Scene {
    /// Creates an empty scene stepping with `settings`.
    pub fn new(
        settings: StepSettings,
        dispatcher: Arc<WorkDispatcher>,
        telemetry: Arc<TelemetryService>,
    ) -> Self {
        Self {
            bodies: Arena::new(),
            broadphase: BroadphaseLane::default(),
            islands: IslandLane::new(),
            settings,
            in_flight: None,
            contacts: Vec::new(),
            contact_cache: ContactCache::new(),
            step_count: 0,
            time: 0.0,
            stats: SimulationStats::new(),
            telemetry,
            dispatcher,
        }
    }

    fn ensure_idle(&self, operation: &str) -> PhysicsResult<()> {
        if self.in_flight.is_some() {
            return Err(PhysicsError::step_in_progress(operation));
        }
        Ok(())
    }

    fn unknown(handle: BodyHandle) -> PhysicsError {
        PhysicsError::new(ErrorKind::UnknownHandle, format!("{handle} is not in the scene"))
    }

    // --- Bodies ---

    /// Adds a body and returns its handle.
    pub fn add_body(&mut self, body: RigidBody) -> PhysicsResult<BodyHandle> {
        self.ensure_idle("add a body")?;
        let handle = self.bodies.insert(body);
        log::trace!("Added {handle}.");
        Ok(handle)
    }

    /// Removes a body, returning it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> PhysicsResult<RigidBody> {
        self.ensure_idle("remove a body")?;
        let body = self.bodies.remove(handle).ok_or_else(|| Self::unknown(handle))?;
        self.broadphase.remove(handle);
        self.contact_cache.remove_body(handle);
        self.contacts
            .retain(|c| c.body_a != handle && c.body_b != handle);
        log::trace!("Removed {handle}.");
        Ok(body)
    }

    /// The body behind `handle`, if it is still in the scene.
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Mutable access to a body between steps, for shape or mass changes.
    pub fn body_mut(&mut self, handle: BodyHandle) -> PhysicsResult<&mut RigidBody> {
        self.ensure_idle("modify a body")?;
        self.bodies.get_mut(handle).ok_or_else(|| Self::unknown(handle))
    }

    /// The published pose of a body.
    pub fn pose(&self, handle: BodyHandle) -> PhysicsResult<Pose> {
        self.bodies
            .get(handle)
            .map(|b| *b.pose())
            .ok_or_else(|| Self::unknown(handle))
    }

    /// Every body, in stable slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> + '_ {
        self.bodies.iter()
    }

    /// Number of bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of dynamic bodies.
    pub fn dynamic_count(&self) -> usize {
        self.bodies.iter().filter(|(_, b)| b.is_dynamic()).count()
    }

    /// Number of static bodies.
    pub fn static_count(&self) -> usize {
        self.bodies.iter().filter(|(_, b)| b.is_static()).count()
    }

    /// Sets the linear velocity of a dynamic body and wakes it.
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> PhysicsResult<()> {
        self.body_mut(handle)?.set_linear_velocity(velocity)
    }

    /// Sets the angular velocity of a dynamic body and wakes it.
    pub fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> PhysicsResult<()> {
        self.body_mut(handle)?.set_angular_velocity(velocity)
    }

    // --- Scene state ---

    /// Gravity applied to dynamic bodies.
    pub fn gravity(&self) -> Vec3 {
        self.settings.integrator.gravity
    }

    /// Changes gravity for the following steps.
    pub fn set_gravity(&mut self, gravity: Vec3) -> PhysicsResult<()> {
        self.ensure_idle("change gravity")?;
        if !gravity.is_finite() {
            return Err(PhysicsError::invalid_parameter(format!(
                "gravity must be finite, got {gravity:?}"
            )));
        }
        self.settings.integrator.gravity = gravity;
        for (_, body) in self.bodies.iter_mut() {
            body.wake_up();
        }
        Ok(())
    }

    /// The settings used for each step; `dt` is supplied per call.
    pub fn settings(&self) -> &StepSettings {
        &self.settings
    }

    /// Contacts resolved during the last published step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Number of published steps.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated time, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Returns `true` between `simulate` and the `fetch_results` that publishes it.
    pub fn is_step_in_progress(&self) -> bool {
        self.in_flight.is_some()
    }

    // --- Stepping ---

    /// Starts a step of `dt` seconds and returns without waiting for it.
    ///
    /// Fails with `StepInProgress` if the previous step has not been fetched,
    /// and with `InvalidParameter` if `dt` is not a positive finite number.
    pub fn simulate(&mut self, dt: f32) -> PhysicsResult<()> {
        self.ensure_idle("simulate")?;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PhysicsError::invalid_parameter(format!(
                "time step must be positive and finite, got {dt}"
            )));
        }
        log::trace!("Step {} begin (dt = {dt}).", self.step_count + 1);
        let started = Instant::now();

        let pairs = self.broadphase.sync(&self.bodies, dt);
        let islands = self.islands.build(&self.bodies, &pairs);
        let settings = StepSettings { dt, ..self.settings };

        let mut tasks = Vec::with_capacity(islands.len());
        for island in islands.iter().filter(|i| !i.is_asleep(&self.bodies)) {
            tasks.push(IslandTask::new(
                island,
                &self.bodies,
                &self.contact_cache,
                settings,
            )?);
        }
        let island_count = tasks.len();

        let job_count = (self.dispatcher.worker_count().max(1) * JOBS_PER_WORKER).min(tasks.len());
        let jobs: Vec<_> = split_evenly(tasks, job_count)
            .into_iter()
            .map(|chunk| move || chunk.into_iter().map(IslandTask::run).collect::<Vec<_>>())
            .collect();
        let batch = self.dispatcher.dispatch(jobs)?;

        self.in_flight = Some(InFlightStep {
            batch,
            dt,
            started,
            island_count,
        });
        Ok(())
    }

    /// Reports whether the in-flight step has finished, without publishing it.
    /// Returns `true` when no step is in flight.
    pub fn check_results(&mut self) -> bool {
        self.in_flight.as_mut().map_or(true, |step| step.batch.poll())
    }

    /// Publishes the in-flight step.
    ///
    /// With `block` set, waits for the workers and returns `Ok(true)`. Without
    /// it, returns `Ok(false)` while work is still pending. With no step in
    /// flight this is a no-op returning `Ok(true)`. If a worker task fails,
    /// the step is discarded and the scene is left as it was before
    /// `simulate`, ready for the next step.
    pub fn fetch_results(&mut self, block: bool) -> PhysicsResult<bool> {
        let Some(step) = self.in_flight.as_mut() else {
            return Ok(true);
        };
        if !block && !step.batch.poll() {
            return Ok(false);
        }
        let Some(step) = self.in_flight.take() else {
            return Ok(true);
        };

        let outcomes = step.batch.wait().inspect_err(|err| {
            log::error!("Step {} discarded: {err}", self.step_count + 1);
        })?;

        self.contacts.clear();
        let outcomes: Vec<IslandOutcome> = outcomes.into_iter().flatten().collect();
        let mut anomalies = 0;
        for outcome in &outcomes {
            for update in &outcome.updates {
                if let Some(body) = self.bodies.get_mut(update.handle) {
                    body.apply_step(
                        update.pose,
                        update.linear_velocity,
                        update.angular_velocity,
                        update.sleep_frames,
                        update.asleep,
                    );
                }
            }
            for handle in &outcome.anomalies {
                log::warn!("Non-finite velocity on {handle} reset to zero.");
            }
            anomalies += outcome.anomalies.len();
            self.contacts.extend_from_slice(&outcome.contacts);
        }

        // Islands skipped while asleep keep their impulses for when they wake.
        let bodies = &self.bodies;
        self.contact_cache.retain(|key| {
            [key.body_a, key.body_b]
                .iter()
                .any(|h| bodies.get(*h).is_some_and(RigidBody::is_sleeping))
        });
        for outcome in outcomes {
            self.contact_cache.extend(outcome.impulses);
        }

        self.step_count += 1;
        self.time += f64::from(step.dt);
        self.stats
            .record_step(step.started.elapsed(), self.contacts.len(), step.island_count);
        self.stats.record_anomalies(anomalies);

        if self.telemetry.should_publish(self.step_count) {
            self.telemetry.publish(self.snapshot());
        }

        log::trace!("Step {} end.", self.step_count);
        if self.step_count % 100 == 0 {
            log::debug!(
                "Step {}: {} islands, {} contacts, {:.3} ms.",
                self.step_count,
                step.island_count,
                self.contacts.len(),
                self.stats.last_step_ms()
            );
        }
        Ok(true)
    }

    /// `simulate` followed by a blocking `fetch_results`.
    pub fn step(&mut self, dt: f32) -> PhysicsResult<()> {
        self.simulate(dt)?;
        self.fetch_results(true).map(|_| ())
    }

    /// The published state, filtered by the telemetry flags.
    pub fn snapshot(&self) -> SceneSnapshot {
        let bodies = self
            .bodies
            .iter()
            .map(|(handle, body)| BodySnapshot {
                handle,
                kind: match body.kind() {
                    BodyKind::Static => BodyKindTag::Static,
                    BodyKind::Dynamic(_) => BodyKindTag::Dynamic,
                },
                position: body.pose().position,
                orientation: body.pose().orientation,
                linear_velocity: body.linear_velocity(),
                angular_velocity: body.angular_velocity(),
            })
            .collect();
        SceneSnapshot::new(
            self.step_count,
            self.time,
            self.telemetry.flags(),
            bodies,
            &self.contacts,
        )
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if let Some(step) = self.in_flight.take() {
            // Let the workers finish before the bodies go away.
            let _ = step.batch.wait();
        }
        log::debug!("Scene released with {} bodies.", self.bodies.len());
    }
}

/// Splits `items` into `parts` contiguous chunks whose sizes differ by at most one.
fn split_evenly<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    if parts == 0 {
        return Vec::new();
    }
    let base = items.len() / parts;
    let extra = items.len() % parts;
    let mut iter = items.into_iter();
    (0..parts)
        .map(|i| iter.by_ref().take(base + usize::from(i < extra)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_order_and_balance() {
        let chunks = split_evenly((0..10).collect::<Vec<_>>(), 4);
        assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 2, 2]);
        assert_eq!(chunks.concat(), (0..10).collect::<Vec<_>>());
        assert!(split_evenly(Vec::<u8>::new(), 0).is_empty());
    }
}
