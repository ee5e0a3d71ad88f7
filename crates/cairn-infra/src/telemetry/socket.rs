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

use std::io::{BufWriter, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use cairn_core::error::{ErrorKind, PhysicsError, PhysicsResult};
use cairn_core::telemetry::TelemetryTransport;

/// Writes telemetry frames to a TCP connection.
#[derive(Debug)]
pub struct SocketTransport {
    stream: BufWriter<TcpStream>,
    peer: SocketAddr,
}

// A zero duration is rejected by the socket options.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

fn unavailable(message: String) -> PhysicsError {
    PhysicsError::new(ErrorKind::TelemetryUnavailable, message)
}

impl SocketTransport {
    /// Connects to `host:port`, giving each resolved address at most `timeout`.
    ///
    /// Each write is then bounded by `write_timeout`, so a stalled debugger
    /// cannot block the telemetry thread forever.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        write_timeout: Duration,
    ) -> PhysicsResult<Self> {
        let timeout = timeout.max(MIN_TIMEOUT);
        let write_timeout = write_timeout.max(MIN_TIMEOUT);
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| unavailable(format!("cannot resolve {host}:{port}: {e}")))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream
                        .set_nodelay(true)
                        .and_then(|_| stream.set_write_timeout(Some(write_timeout)))
                        .map_err(|e| unavailable(format!("cannot configure socket to {addr}: {e}")))?;
                    log::info!("Telemetry connected to {addr}.");
                    return Ok(Self {
                        stream: BufWriter::new(stream),
                        peer: addr,
                    });
                }
                Err(e) => last_error = Some(format!("{addr}: {e}")),
            }
        }

        Err(unavailable(format!(
            "cannot connect to {host}:{port} ({})",
            last_error.unwrap_or_else(|| "no address resolved".to_owned())
        )))
    }

    /// The address of the connected peer.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The bound on a single write.
    pub fn write_timeout(&self) -> PhysicsResult<Option<Duration>> {
        self.stream
            .get_ref()
            .write_timeout()
            .map_err(|e| unavailable(format!("cannot read socket options of {}: {e}", self.peer)))
    }
}

impl TelemetryTransport for SocketTransport {
    fn send(&mut self, frame: &[u8]) -> PhysicsResult<()> {
        self.stream
            .write_all(frame)
            .map_err(|e| unavailable(format!("write to {} failed: {e}", self.peer)))
    }

    fn flush(&mut self) -> PhysicsResult<()> {
        self.stream
            .flush()
            .map_err(|e| unavailable(format!("flush to {} failed: {e}", self.peer)))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.peer)
    }
}
