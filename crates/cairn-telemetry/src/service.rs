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

//! Service forwarding scene snapshots to a transport on a background thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cairn_core::error::{ErrorKind, PhysicsError, PhysicsResult};
use cairn_core::telemetry::{SceneSnapshot, TelemetryFlags, TelemetryTransport};

use crate::wire::WireFormat;

/// What the service publishes and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSettings {
    /// Data categories to include.
    pub flags: TelemetryFlags,
    /// Publish every n-th step; values below one count as one.
    pub publish_interval: u64,
    /// Frame encoding.
    pub format: WireFormat,
    /// Snapshots that may wait for the writer before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            flags: TelemetryFlags::default(),
            publish_interval: 1,
            format: WireFormat::default(),
            queue_capacity: 8,
        }
    }
}

/// Best-effort snapshot sink.
///
/// Publishing never blocks the simulation: snapshots are queued for a writer
/// thread and dropped when the queue is full. The first transport failure is
/// logged once and disables the service for the rest of its lifetime.
#[derive(Debug)]
pub struct TelemetryService {
    sender: Option<flume::Sender<SceneSnapshot>>,
    writer: Option<JoinHandle<()>>,
    enabled: Arc<AtomicBool>,
    sent: Arc<AtomicU64>,
    dropped: AtomicU64,
    settings: PublishSettings,
    endpoint: String,
}

impl TelemetryService {
    /// A service that publishes nothing.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            writer: None,
            enabled: Arc::new(AtomicBool::new(false)),
            sent: Arc::new(AtomicU64::new(0)),
            dropped: AtomicU64::new(0),
            settings: PublishSettings::default(),
            endpoint: "disabled".to_owned(),
        }
    }

    /// Starts the writer thread over `transport`.
    pub fn start(
        transport: Box<dyn TelemetryTransport>,
        settings: PublishSettings,
    ) -> PhysicsResult<Self> {
        let (sender, receiver) = flume::bounded::<SceneSnapshot>(settings.queue_capacity.max(1));
        let enabled = Arc::new(AtomicBool::new(true));
        let sent = Arc::new(AtomicU64::new(0));
        let endpoint = transport.describe();

        let writer = {
            let enabled = Arc::clone(&enabled);
            let sent = Arc::clone(&sent);
            let format = settings.format;
            thread::Builder::new()
                .name("cairn-telemetry".to_owned())
                .spawn(move || write_loop(transport, receiver, format, &enabled, &sent))
                .map_err(|e| {
                    PhysicsError::new(
                        ErrorKind::AllocationFailure,
                        format!("failed to spawn the telemetry thread: {e}"),
                    )
                })?
        };

        log::info!("Telemetry publishing to {endpoint}.");
        Ok(Self {
            sender: Some(sender),
            writer: Some(writer),
            enabled,
            sent,
            dropped: AtomicU64::new(0),
            settings,
            endpoint,
        })
    }

    /// Returns `true` while snapshots are being delivered.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// The data categories requested.
    pub fn flags(&self) -> TelemetryFlags {
        self.settings.flags
    }

    /// The transport endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns `true` if a snapshot for `step` should be built.
    pub fn should_publish(&self, step: u64) -> bool {
        self.is_enabled() && step % self.settings.publish_interval.max(1) == 0
    }

    /// Queues a snapshot without blocking.
    pub fn publish(&self, snapshot: SceneSnapshot) {
        let Some(sender) = &self.sender else {
            return;
        };
        if !self.is_enabled() {
            return;
        }
        match sender.try_send(snapshot) {
            Ok(()) => {}
            Err(flume::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::trace!("Telemetry queue full; snapshot dropped.");
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                self.enabled.store(false, Ordering::Release);
            }
        }
    }

    /// Snapshots written to the transport.
    pub fn frames_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Snapshots dropped because the writer lagged behind.
    pub fn frames_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drains the queue, flushes and closes the transport.
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                log::error!("The telemetry thread terminated abnormally.");
            }
            log::debug!(
                "Telemetry to {} closed: {} sent, {} dropped.",
                self.endpoint,
                self.frames_sent(),
                self.frames_dropped()
            );
        }
    }
}

impl Drop for TelemetryService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn write_loop(
    mut transport: Box<dyn TelemetryTransport>,
    receiver: flume::Receiver<SceneSnapshot>,
    format: WireFormat,
    enabled: &AtomicBool,
    sent: &AtomicU64,
) {
    let mut deliver = |snapshot: &SceneSnapshot| -> PhysicsResult<()> {
        let frame = format.encode(snapshot)?;
        transport.send(&frame)?;
        transport.flush()
    };

    for snapshot in receiver.iter() {
        if let Err(err) = deliver(&snapshot) {
            log::warn!("Telemetry unavailable, continuing without it: {err}");
            enabled.store(false, Ordering::Release);
            return;
        }
        sent.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn snapshot(step: u64) -> SceneSnapshot {
        SceneSnapshot::new(step, 0.0, TelemetryFlags::default(), Vec::new(), &[])
    }

    #[test]
    fn snapshots_reach_the_transport_in_order() {
        let transport = MemoryTransport::new();
        let settings = PublishSettings {
            queue_capacity: 64,
            ..PublishSettings::default()
        };
        let mut service = TelemetryService::start(Box::new(transport.clone()), settings).unwrap();
        for step in 1..=5 {
            service.publish(snapshot(step));
        }
        service.shutdown();

        let decoded = WireFormat::JsonLines.decode_stream(&transport.bytes()).unwrap();
        assert_eq!(decoded.iter().map(|s| s.step).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(service.frames_sent(), 5);
    }

    #[test]
    fn transport_failure_disables_the_service() {
        let transport = MemoryTransport::failing_after(1);
        let settings = PublishSettings {
            queue_capacity: 64,
            ..PublishSettings::default()
        };
        let mut service = TelemetryService::start(Box::new(transport.clone()), settings).unwrap();
        for step in 1..=3 {
            service.publish(snapshot(step));
        }
        service.shutdown();

        assert!(!service.is_enabled());
        assert_eq!(transport.frame_count(), 1);
        // Publishing after the failure is a silent no-op.
        service.publish(snapshot(4));
        assert_eq!(service.frames_sent(), 1);
    }

    #[test]
    fn publish_interval_throttles() {
        let settings = PublishSettings {
            publish_interval: 3,
            ..PublishSettings::default()
        };
        let service = TelemetryService::start(Box::new(MemoryTransport::new()), settings).unwrap();
        let published: Vec<u64> = (1..=9).filter(|s| service.should_publish(*s)).collect();
        assert_eq!(published, vec![3, 6, 9]);
    }

    #[test]
    fn disabled_service_ignores_everything() {
        let service = TelemetryService::disabled();
        assert!(!service.is_enabled());
        assert!(!service.should_publish(1));
        service.publish(snapshot(1));
        assert_eq!(service.frames_sent(), 0);
    }
}
