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

//! Step statistics.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Running statistics over the steps of a simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationStats {
    steps: u64,
    total_step_time: Duration,
    last_step_time: Duration,
    max_step_time: Duration,
    last_contact_count: usize,
    max_contact_count: usize,
    last_island_count: usize,
    anomalies: u64,
}

impl SimulationStats {
    /// Empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed step.
    pub fn record_step(&mut self, elapsed: Duration, contacts: usize, islands: usize) {
        self.steps += 1;
        self.total_step_time += elapsed;
        self.last_step_time = elapsed;
        self.max_step_time = self.max_step_time.max(elapsed);
        self.last_contact_count = contacts;
        self.max_contact_count = self.max_contact_count.max(contacts);
        self.last_island_count = islands;
    }

    /// Records velocities that had to be reset.
    pub fn record_anomalies(&mut self, count: usize) {
        self.anomalies += count as u64;
    }

    /// Completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Duration of the last step, in milliseconds.
    pub fn last_step_ms(&self) -> f64 {
        self.last_step_time.as_secs_f64() * 1000.0
    }

    /// Longest step, in milliseconds.
    pub fn max_step_ms(&self) -> f64 {
        self.max_step_time.as_secs_f64() * 1000.0
    }

    /// Mean step duration, in milliseconds. Zero before the first step.
    pub fn average_step_ms(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.total_step_time.as_secs_f64() * 1000.0 / self.steps as f64
    }

    /// Contacts of the last step.
    pub fn contact_count(&self) -> usize {
        self.last_contact_count
    }

    /// Highest contact count of any step.
    pub fn max_contact_count(&self) -> usize {
        self.max_contact_count
    }

    /// Islands of the last step.
    pub fn island_count(&self) -> usize {
        self.last_island_count
    }

    /// Velocities reset so far.
    pub fn anomaly_count(&self) -> u64 {
        self.anomalies
    }
}

impl fmt::Display for SimulationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps, avg {:.3} ms, max {:.3} ms, last {:.3} ms, {} contacts ({} max), {} islands, {} anomalies",
            self.steps,
            self.average_step_ms(),
            self.max_step_ms(),
            self.last_step_ms(),
            self.last_contact_count,
            self.max_contact_count,
            self.last_island_count,
            self.anomalies
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn averages_and_maxima() {
        let mut stats = SimulationStats::new();
        assert_eq!(stats.average_step_ms(), 0.0);

        stats.record_step(Duration::from_millis(2), 10, 3);
        stats.record_step(Duration::from_millis(4), 6, 2);
        stats.record_anomalies(1);

        assert_eq!(stats.steps(), 2);
        assert_relative_eq!(stats.average_step_ms(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(stats.max_step_ms(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(stats.last_step_ms(), 4.0, epsilon = 1e-9);
        assert_eq!(stats.contact_count(), 6);
        assert_eq!(stats.max_contact_count(), 10);
        assert_eq!(stats.island_count(), 2);
        assert_eq!(stats.anomaly_count(), 1);
        assert!(stats.to_string().starts_with("2 steps"));
    }
}
