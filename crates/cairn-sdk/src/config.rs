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

//! Configuration of a physics context.

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use cairn_core::error::{PhysicsError, PhysicsResult};
use cairn_core::math::Vec3;
use cairn_core::physics::{Integrator, NarrowPhase, SolverSettings};
use cairn_core::telemetry::TelemetryFlags;
use cairn_lanes::{SleepSettings, StepSettings};
use cairn_telemetry::{PublishSettings, WireFormat};
use serde::{Deserialize, Serialize};

/// Valid range for the solver iteration count.
pub const SOLVER_ITERATIONS: std::ops::RangeInclusive<u32> = 1..=64;

/// Sleep behaviour of resting islands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    /// Whether islands may fall asleep.
    pub enabled: bool,
    /// Linear speed threshold.
    pub linear_threshold: f32,
    /// Angular speed threshold.
    pub angular_threshold: f32,
    /// Consecutive resting steps before sleeping.
    pub frames: u32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        let d = SleepSettings::default();
        Self {
            enabled: d.enabled,
            linear_threshold: d.linear_threshold,
            angular_threshold: d.angular_threshold,
            frames: d.frames,
        }
    }
}

/// Connection to the external debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Whether to try connecting at all.
    pub enabled: bool,
    /// Debugger host.
    pub host: String,
    /// Debugger port.
    pub port: u16,
    /// Connect timeout, in milliseconds.
    pub timeout_ms: u64,
    /// Bound on a single frame write once connected, in milliseconds.
    pub write_timeout_ms: u64,
    /// Data categories to transmit.
    pub flags: TelemetryFlags,
    /// Publish every n-th step.
    pub publish_interval: u64,
    /// Frame encoding.
    pub format: WireFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_owned(),
            port: 5425,
            timeout_ms: 10,
            write_timeout_ms: 250,
            flags: TelemetryFlags::default(),
            publish_interval: 1,
            format: WireFormat::JsonLines,
        }
    }
}

impl TelemetryConfig {
    /// The connect timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The write timeout.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Settings for the telemetry service.
    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            flags: self.flags,
            publish_interval: self.publish_interval,
            format: self.format,
            ..PublishSettings::default()
        }
    }
}

/// Everything needed to build a [`PhysicsContext`](crate::PhysicsContext).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity acceleration.
    pub gravity: [f32; 3],
    /// Worker threads; zero runs island tasks on the calling thread.
    pub worker_threads: usize,
    /// Solver velocity iterations.
    pub solver_iterations: u32,
    /// Fraction of penetration corrected per step.
    pub baumgarte: f32,
    /// Penetration tolerated without correction.
    pub slop: f32,
    /// Angular speed clamp, in rad/s.
    pub max_angular_velocity: f32,
    /// Sleep behaviour.
    pub sleep: SleepConfig,
    /// Debugger connection.
    pub telemetry: TelemetryConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let integrator = Integrator::default();
        let solver = SolverSettings::default();
        Self {
            gravity: integrator.gravity.to_array(),
            worker_threads: 2,
            solver_iterations: solver.iterations,
            baumgarte: solver.baumgarte,
            slop: solver.slop,
            max_angular_velocity: integrator.max_angular_velocity,
            sleep: SleepConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl PhysicsConfig {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> PhysicsResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PhysicsError::invalid_parameter(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("failed to load configuration {}", path.display()))?;
        log::debug!("Loaded configuration from {}.", path.display());
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("failed to serialize configuration")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write configuration {}", path.display()))
    }

    /// Checks every value, returning `InvalidParameter` on the first bad one.
    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::invalid_parameter("gravity must be finite"));
        }
        if !SOLVER_ITERATIONS.contains(&self.solver_iterations) {
            return Err(PhysicsError::invalid_parameter(format!(
                "solver_iterations must be in {SOLVER_ITERATIONS:?}, got {}",
                self.solver_iterations
            )));
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(PhysicsError::invalid_parameter(format!(
                "baumgarte must be in [0, 1], got {}",
                self.baumgarte
            )));
        }
        if !self.slop.is_finite() || self.slop < 0.0 {
            return Err(PhysicsError::invalid_parameter(format!(
                "slop must be finite and non-negative, got {}",
                self.slop
            )));
        }
        if !self.max_angular_velocity.is_finite() || self.max_angular_velocity <= 0.0 {
            return Err(PhysicsError::invalid_parameter(format!(
                "max_angular_velocity must be positive, got {}",
                self.max_angular_velocity
            )));
        }
        let sleep = &self.sleep;
        if !(sleep.linear_threshold >= 0.0 && sleep.angular_threshold >= 0.0) || sleep.frames == 0 {
            return Err(PhysicsError::invalid_parameter(
                "sleep thresholds must be non-negative and frames positive",
            ));
        }
        if self.telemetry.enabled && self.telemetry.host.trim().is_empty() {
            return Err(PhysicsError::invalid_parameter("telemetry host is empty"));
        }
        if self.telemetry.publish_interval == 0 {
            return Err(PhysicsError::invalid_parameter(
                "telemetry publish_interval must be at least 1",
            ));
        }
        Ok(())
    }

    /// The per-step settings derived from this configuration.
    pub fn step_settings(&self) -> StepSettings {
        StepSettings {
            integrator: Integrator {
                gravity: Vec3::from(self.gravity),
                max_angular_velocity: self.max_angular_velocity,
            },
            solver: SolverSettings {
                iterations: self.solver_iterations,
                baumgarte: self.baumgarte,
                slop: self.slop,
                ..SolverSettings::default()
            },
            narrow_phase: NarrowPhase::default(),
            sleep: SleepSettings {
                enabled: self.sleep.enabled,
                linear_threshold: self.sleep.linear_threshold,
                angular_threshold: self.sleep.angular_threshold,
                frames: self.sleep.frames,
            },
            ..StepSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PhysicsConfig::default();
        config.validate().unwrap();
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.solver_iterations, 8);
        assert_eq!(config.telemetry.port, 5425);
        assert!(!config.sleep.enabled);
    }

    #[test]
    fn step_settings_follow_the_config() {
        let config = PhysicsConfig {
            gravity: [0.0, -1.0, 0.0],
            solver_iterations: 4,
            ..PhysicsConfig::default()
        };
        let settings = config.step_settings();
        assert_eq!(settings.integrator.gravity, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(settings.solver.iterations, 4);
    }

    #[test]
    fn telemetry_writes_outlast_the_connect_timeout() {
        let telemetry = TelemetryConfig::default();
        assert_eq!(telemetry.timeout(), Duration::from_millis(10));
        assert_eq!(telemetry.write_timeout(), Duration::from_millis(250));

        let parsed: TelemetryConfig = serde_json::from_str(r#"{"timeout_ms": 5}"#).unwrap();
        assert_eq!(parsed.write_timeout_ms, 250);
    }
}
