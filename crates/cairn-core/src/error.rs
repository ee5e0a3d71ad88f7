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

//! Error taxonomy shared by every cairn crate.

use std::fmt;

/// The category of a [`PhysicsError`].
///
/// `InvalidGeometry` and `StepInProgress` are programmer errors and are surfaced
/// immediately. `AllocationFailure` during world setup is fatal to the caller.
/// `TelemetryUnavailable` is recovered locally by disabling the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A shape was created with degenerate or non-finite geometry.
    InvalidGeometry,
    /// `simulate` was called while a step was still in flight, or the scene was
    /// mutated mid-step.
    StepInProgress,
    /// A resource (thread, buffer) could not be acquired.
    AllocationFailure,
    /// The debug telemetry sink could not be reached or written to.
    TelemetryUnavailable,
    /// A numeric parameter (timestep, density, coefficient, config value) is out of range.
    InvalidParameter,
    /// A body handle is stale or was never issued by this scene.
    UnknownHandle,
    /// A worker task failed while executing a step.
    DispatchFailure,
}

impl ErrorKind {
    /// Returns `true` for errors caused by misuse of the API rather than by the environment.
    pub fn is_programmer_error(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidGeometry
                | ErrorKind::StepInProgress
                | ErrorKind::InvalidParameter
                | ErrorKind::UnknownHandle
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidGeometry => "invalid geometry",
            ErrorKind::StepInProgress => "step in progress",
            ErrorKind::AllocationFailure => "allocation failure",
            ErrorKind::TelemetryUnavailable => "telemetry unavailable",
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::UnknownHandle => "unknown handle",
            ErrorKind::DispatchFailure => "dispatch failure",
        };
        f.write_str(name)
    }
}

/// An error raised by the physics core, tagged with its [`ErrorKind`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PhysicsError {
    kind: ErrorKind,
    message: String,
}

/// Convenience alias used across the cairn crates.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

impl PhysicsError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for an [`ErrorKind::InvalidGeometry`] error.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidGeometry, message)
    }

    /// Shorthand for an [`ErrorKind::InvalidParameter`] error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }

    /// Shorthand for an [`ErrorKind::StepInProgress`] error.
    pub fn step_in_progress(operation: &str) -> Self {
        Self::new(
            ErrorKind::StepInProgress,
            format!("cannot {operation} while a step is in flight; call fetch_results first"),
        )
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable detail attached to this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = PhysicsError::invalid_geometry("box half extent 0 on axis y");
        assert_eq!(err.kind(), ErrorKind::InvalidGeometry);
        assert_eq!(
            err.to_string(),
            "invalid geometry: box half extent 0 on axis y"
        );
    }

    #[test]
    fn programmer_errors_are_classified() {
        assert!(ErrorKind::StepInProgress.is_programmer_error());
        assert!(ErrorKind::UnknownHandle.is_programmer_error());
        assert!(!ErrorKind::TelemetryUnavailable.is_programmer_error());
        assert!(!ErrorKind::AllocationFailure.is_programmer_error());
    }
}
