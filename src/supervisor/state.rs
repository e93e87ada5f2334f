// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Supervisor lifecycle states.

use std::fmt;

/// Why a streaming session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The log process exited on its own.
    Exited,
    /// The log tool reported an unrecoverable condition on stderr.
    FatalMarker,
    /// The log process could not be started.
    SpawnFailed,
    /// Reconnecting to the device failed.
    ConnectFailed,
    /// The log backlog could not be cleared before restarting.
    FlushFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exited => "log process exited",
            Self::FatalMarker => "fatal marker on stderr",
            Self::SpawnFailed => "log process failed to start",
            Self::ConnectFailed => "device connection failed",
            Self::FlushFailed => "log backlog flush failed",
        })
    }
}

/// Lifecycle state of the log source supervisor.
///
/// `Disconnected -> Connecting -> Streaming -> Failed -> Connecting -> ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupervisorState {
    /// No session; nothing has been attempted yet.
    #[default]
    Disconnected,
    /// Establishing the device session.
    Connecting {
        /// 1-based attempt counter, reset for every new session.
        attempt: u32,
    },
    /// The log stream is running and being tailed.
    Streaming,
    /// The previous session ended, or an attempt to re-establish it failed.
    Failed(FailureReason),
}

impl SupervisorState {
    /// Returns `true` while a log stream is running.
    #[must_use]
    pub const fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    /// Returns `true` if the last session ended.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting { attempt } => write!(f, "connecting (attempt {attempt})"),
            Self::Streaming => f.write_str("streaming"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disconnected() {
        assert_eq!(SupervisorState::default(), SupervisorState::Disconnected);
    }

    #[test]
    fn predicates() {
        assert!(SupervisorState::Streaming.is_streaming());
        assert!(!SupervisorState::Connecting { attempt: 1 }.is_streaming());
        assert!(SupervisorState::Failed(FailureReason::Exited).is_failed());
        assert!(!SupervisorState::Disconnected.is_failed());
    }

    #[test]
    fn display() {
        assert_eq!(
            SupervisorState::Connecting { attempt: 3 }.to_string(),
            "connecting (attempt 3)"
        );
        assert_eq!(
            SupervisorState::Failed(FailureReason::FatalMarker).to_string(),
            "failed: fatal marker on stderr"
        );
        assert_eq!(
            SupervisorState::Failed(FailureReason::ConnectFailed).to_string(),
            "failed: device connection failed"
        );
    }
}
