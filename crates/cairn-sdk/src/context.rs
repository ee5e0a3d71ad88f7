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

//! The explicit owner of everything a simulation needs.

use std::sync::Arc;

use cairn_core::error::PhysicsResult;
use cairn_core::telemetry::TelemetryTransport;
use cairn_infra::{SocketTransport, WorkDispatcher};
use cairn_telemetry::TelemetryService;

use crate::config::PhysicsConfig;
use crate::scene::Scene;

/// Owns the telemetry service, the worker pool and the scene.
///
/// Telemetry is connected first, then the workers are spawned, then the scene
/// is built over both. Fields drop in declaration order and the scene holds
/// the last clones of the shared services, so the scene goes first, then
/// telemetry is flushed and closed, then the workers are joined.
#[derive(Debug)]
pub struct PhysicsContext {
    scene: Scene,
    telemetry: Arc<TelemetryService>,
    dispatcher: Arc<WorkDispatcher>,
    config: PhysicsConfig,
}

impl PhysicsContext {
    /// Builds a context from `config`, connecting to the debugger if enabled.
    ///
    /// An unreachable debugger is not an error: a warning is logged and the
    /// simulation runs without telemetry.
    pub fn new(config: PhysicsConfig) -> PhysicsResult<Self> {
        config.validate()?;
        let telemetry = if config.telemetry.enabled {
            let t = &config.telemetry;
            match SocketTransport::connect(&t.host, t.port, t.timeout(), t.write_timeout()) {
                Ok(transport) => TelemetryService::start(Box::new(transport), t.publish_settings())?,
                Err(err) => {
                    log::warn!("Telemetry unavailable, continuing without it: {err}");
                    TelemetryService::disabled()
                }
            }
        } else {
            TelemetryService::disabled()
        };
        Self::assemble(config, telemetry)
    }

    /// Builds a context that publishes through `transport`.
    pub fn with_transport(
        config: PhysicsConfig,
        transport: Box<dyn TelemetryTransport>,
    ) -> PhysicsResult<Self> {
        config.validate()?;
        let telemetry = TelemetryService::start(transport, config.telemetry.publish_settings())?;
        Self::assemble(config, telemetry)
    }

    fn assemble(config: PhysicsConfig, telemetry: TelemetryService) -> PhysicsResult<Self> {
        let dispatcher = Arc::new(WorkDispatcher::new(config.worker_threads)?);
        let telemetry = Arc::new(telemetry);
        let scene = Scene::new(
            config.step_settings(),
            Arc::clone(&dispatcher),
            Arc::clone(&telemetry),
        );
        log::info!(
            "Physics context ready: {} worker(s), {} solver iterations.",
            dispatcher.worker_count(),
            config.solver_iterations
        );
        Ok(Self {
            scene,
            telemetry,
            dispatcher,
            config,
        })
    }

    /// The scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The scene, mutably.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The telemetry service.
    pub fn telemetry(&self) -> &TelemetryService {
        &self.telemetry
    }

    /// The worker pool.
    pub fn dispatcher(&self) -> &WorkDispatcher {
        &self.dispatcher
    }

    /// The configuration the context was built from.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Releases everything, logging the final statistics.
    pub fn shutdown(self) {
        log::info!("Simulation statistics: {}", self.scene.stats());
        drop(self);
        log::info!("Physics resources released.");
    }
}
