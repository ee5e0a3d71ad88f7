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

//! Snapshot types mirrored to an external debugger, and the transport contract.
//!
//! The concrete transport (a TCP socket) lives in `cairn-infra`; the service that
//! throttles, encodes and ships snapshots lives in `cairn-telemetry`. Both meet
//! at the types defined here.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::PhysicsResult;
use crate::math::{Quaternion, Vec3};
use crate::physics::{BodyHandle, Contact};

/// Categories of scene data a snapshot may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryFlags {
    /// Transmit solver constraint data (accumulated impulses).
    pub constraints: bool,
    /// Transmit contact points.
    pub contacts: bool,
    /// Transmit scene-query data. Carried in the header only.
    pub scene_queries: bool,
}

impl Default for TelemetryFlags {
    fn default() -> Self {
        Self {
            constraints: true,
            contacts: true,
            scene_queries: true,
        }
    }
}

/// Whether a snapshotted body is static or dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKindTag {
    /// Never moved by the simulation.
    Static,
    /// Integrated every step.
    Dynamic,
}

/// The published state of one body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    /// The body.
    pub handle: BodyHandle,
    /// Static or dynamic.
    pub kind: BodyKindTag,
    /// Position of the body frame.
    pub position: Vec3,
    /// Orientation of the body frame.
    pub orientation: Quaternion,
    /// Linear velocity; zero for static bodies.
    pub linear_velocity: Vec3,
    /// Angular velocity; zero for static bodies.
    pub angular_velocity: Vec3,
}

/// One contact point as seen by the debugger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    /// First body.
    pub body_a: BodyHandle,
    /// Second body.
    pub body_b: BodyHandle,
    /// World-space point.
    pub point: Vec3,
    /// Normal from `body_a` towards `body_b`.
    pub normal: Vec3,
    /// Penetration depth.
    pub depth: f32,
    /// Accumulated normal impulse; present only when constraint data is requested.
    pub impulse: Option<f32>,
}

impl ContactSnapshot {
    /// Builds the snapshot of `contact`, keeping the impulse if `with_impulse`.
    pub fn from_contact(contact: &Contact, with_impulse: bool) -> Self {
        Self {
            body_a: contact.body_a,
            body_b: contact.body_b,
            point: contact.point,
            normal: contact.normal,
            depth: contact.depth,
            impulse: with_impulse.then_some(contact.normal_impulse),
        }
    }
}

/// Everything published for one completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Number of completed steps, this one included.
    pub step: u64,
    /// Simulated time in seconds.
    pub time: f64,
    /// The categories this snapshot was filtered with.
    pub flags: TelemetryFlags,
    /// Every body in the scene, in enumeration order.
    pub bodies: Vec<BodySnapshot>,
    /// Contacts of the step; empty unless contacts or constraints are requested.
    pub contacts: Vec<ContactSnapshot>,
}

impl SceneSnapshot {
    /// Creates a snapshot, filtering `contacts` according to `flags`.
    pub fn new(
        step: u64,
        time: f64,
        flags: TelemetryFlags,
        bodies: Vec<BodySnapshot>,
        contacts: &[Contact],
    ) -> Self {
        let contacts = if flags.contacts || flags.constraints {
            contacts
                .iter()
                .map(|c| ContactSnapshot::from_contact(c, flags.constraints))
                .collect()
        } else {
            Vec::new()
        };
        Self {
            step,
            time,
            flags,
            bodies,
            contacts,
        }
    }
}

/// A byte sink towards an external debugger.
///
/// Implementations report every failure as `ErrorKind::TelemetryUnavailable`;
/// callers treat telemetry as best-effort.
pub trait TelemetryTransport: Send + Debug {
    /// Writes one encoded frame.
    fn send(&mut self, frame: &[u8]) -> PhysicsResult<()>;

    /// Flushes buffered frames.
    fn flush(&mut self) -> PhysicsResult<()>;

    /// Human-readable endpoint, used in log messages.
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> Contact {
        Contact {
            body_a: BodyHandle { index: 0, generation: 0 },
            body_b: BodyHandle { index: 1, generation: 0 },
            point: Vec3::ZERO,
            normal: Vec3::Y,
            depth: 0.01,
            static_friction: 0.5,
            dynamic_friction: 0.5,
            restitution: 0.6,
            normal_impulse: 3.0,
        }
    }

    #[test]
    fn flags_filter_contacts() {
        let all = SceneSnapshot::new(1, 0.1, TelemetryFlags::default(), vec![], &[contact()]);
        assert_eq!(all.contacts.len(), 1);
        assert_eq!(all.contacts[0].impulse, Some(3.0));

        let points_only = TelemetryFlags {
            constraints: false,
            ..TelemetryFlags::default()
        };
        let snap = SceneSnapshot::new(1, 0.1, points_only, vec![], &[contact()]);
        assert_eq!(snap.contacts[0].impulse, None);

        let none = TelemetryFlags {
            constraints: false,
            contacts: false,
            scene_queries: false,
        };
        assert!(SceneSnapshot::new(1, 0.1, none, vec![], &[contact()]).contacts.is_empty());
    }

    #[test]
    fn missing_flags_default_to_enabled() {
        let flags: TelemetryFlags = serde_json::from_str(r#"{"contacts": false}"#).unwrap();
        assert!(!flags.contacts);
        assert!(flags.constraints);
    }
}
