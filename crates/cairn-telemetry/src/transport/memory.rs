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

use std::sync::{Arc, Mutex, PoisonError};

use cairn_core::error::{ErrorKind, PhysicsError, PhysicsResult};
use cairn_core::telemetry::TelemetryTransport;

/// Collects frames in a shared buffer.
///
/// Clones share the buffer, so a test can keep one clone and hand the other to
/// a [`TelemetryService`](crate::TelemetryService).
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    buffer: Arc<Mutex<Vec<u8>>>,
    frames: Arc<Mutex<usize>>,
    capacity: Option<usize>,
}

impl MemoryTransport {
    /// An unbounded in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that fails once more than `frames` frames have been written,
    /// like a peer that goes away.
    pub fn failing_after(frames: usize) -> Self {
        Self {
            capacity: Some(frames),
            ..Self::default()
        }
    }

    /// Everything written so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of frames accepted so far.
    pub fn frame_count(&self) -> usize {
        *self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TelemetryTransport for MemoryTransport {
    fn send(&mut self, frame: &[u8]) -> PhysicsResult<()> {
        let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
        if self.capacity.is_some_and(|cap| *frames >= cap) {
            return Err(PhysicsError::new(
                ErrorKind::TelemetryUnavailable,
                "memory transport closed",
            ));
        }
        *frames += 1;
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(frame);
        Ok(())
    }

    fn flush(&mut self) -> PhysicsResult<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_owned()
    }
}
