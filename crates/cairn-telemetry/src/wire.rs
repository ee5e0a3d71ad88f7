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

//! Encoding of snapshots into frames.

use cairn_core::error::{ErrorKind, PhysicsError, PhysicsResult};
use cairn_core::telemetry::SceneSnapshot;
use serde::{Deserialize, Serialize};

/// How snapshots are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WireFormat {
    /// One JSON document per line.
    #[default]
    JsonLines,
    /// `bincode` payloads, each prefixed by its length as a little-endian `u32`.
    Bincode,
}

fn encoding_error(message: String) -> PhysicsError {
    PhysicsError::new(ErrorKind::TelemetryUnavailable, message)
}

impl WireFormat {
    /// Encodes one snapshot as a self-delimiting frame.
    pub fn encode(self, snapshot: &SceneSnapshot) -> PhysicsResult<Vec<u8>> {
        match self {
            WireFormat::JsonLines => {
                let mut frame = serde_json::to_vec(snapshot)
                    .map_err(|e| encoding_error(format!("json encoding failed: {e}")))?;
                frame.push(b'\n');
                Ok(frame)
            }
            WireFormat::Bincode => {
                let payload = bincode::serde::encode_to_vec(snapshot, bincode::config::standard())
                    .map_err(|e| encoding_error(format!("bincode encoding failed: {e}")))?;
                let len = u32::try_from(payload.len())
                    .map_err(|_| encoding_error(format!("frame of {} bytes is too large", payload.len())))?;
                let mut frame = Vec::with_capacity(4 + payload.len());
                frame.extend_from_slice(&len.to_le_bytes());
                frame.extend_from_slice(&payload);
                Ok(frame)
            }
        }
    }

    /// Decodes a byte stream made of consecutive frames.
    pub fn decode_stream(self, mut bytes: &[u8]) -> PhysicsResult<Vec<SceneSnapshot>> {
        let mut snapshots = Vec::new();
        match self {
            WireFormat::JsonLines => {
                for line in bytes.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
                    let snapshot = serde_json::from_slice(line)
                        .map_err(|e| encoding_error(format!("json decoding failed: {e}")))?;
                    snapshots.push(snapshot);
                }
            }
            WireFormat::Bincode => {
                while !bytes.is_empty() {
                    let (header, rest) = bytes
                        .split_first_chunk::<4>()
                        .ok_or_else(|| encoding_error("truncated frame header".to_owned()))?;
                    let len = u32::from_le_bytes(*header) as usize;
                    if rest.len() < len {
                        return Err(encoding_error("truncated frame payload".to_owned()));
                    }
                    let (payload, rest) = rest.split_at(len);
                    let (snapshot, _) = bincode::serde::decode_from_slice::<SceneSnapshot, _>(
                        payload,
                        bincode::config::standard(),
                    )
                    .map_err(|e| encoding_error(format!("bincode decoding failed: {e}")))?;
                    snapshots.push(snapshot);
                    bytes = rest;
                }
            }
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::math::{Quaternion, Vec3};
    use cairn_core::physics::BodyHandle;
    use cairn_core::telemetry::{BodyKindTag, BodySnapshot, TelemetryFlags};

    fn snapshot(step: u64) -> SceneSnapshot {
        let body = BodySnapshot {
            handle: BodyHandle {
                index: 3,
                generation: 1,
            },
            kind: BodyKindTag::Dynamic,
            position: Vec3::new(1.0, 2.0, 3.0),
            orientation: Quaternion::IDENTITY,
            linear_velocity: Vec3::new(0.0, -1.0, 0.0),
            angular_velocity: Vec3::ZERO,
        };
        SceneSnapshot::new(step, step as f64 / 60.0, TelemetryFlags::default(), vec![body], &[])
    }

    #[test]
    fn json_frames_are_single_lines() {
        let frame = WireFormat::JsonLines.encode(&snapshot(1)).unwrap();
        assert_eq!(frame.last(), Some(&b'\n'));
        assert_eq!(frame.iter().filter(|b| **b == b'\n').count(), 1);
        let text = String::from_utf8(frame).unwrap();
        assert!(text.contains("\"step\":1"));
    }

    #[test]
    fn bincode_frames_carry_their_length() {
        let frame = WireFormat::Bincode.encode(&snapshot(7)).unwrap();
        let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);
    }

    #[test]
    fn streams_of_frames_decode_in_order() {
        for format in [WireFormat::JsonLines, WireFormat::Bincode] {
            let mut stream = Vec::new();
            for step in 1..=3 {
                stream.extend(format.encode(&snapshot(step)).unwrap());
            }
            let decoded = format.decode_stream(&stream).unwrap();
            assert_eq!(decoded.iter().map(|s| s.step).collect::<Vec<_>>(), vec![1, 2, 3]);
            assert_eq!(decoded[2].bodies, snapshot(3).bodies);
        }
    }

    #[test]
    fn truncated_bincode_stream_is_rejected() {
        let frame = WireFormat::Bincode.encode(&snapshot(1)).unwrap();
        let err = WireFormat::Bincode
            .decode_stream(&frame[..frame.len() - 1])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TelemetryUnavailable);
    }
}
