// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the watcher.
//!
//! The hierarchy mirrors the moving parts of the engine: the log source
//! (process I/O), the supervisor (fatal session outcomes), the actuator
//! (HyperHDR HTTP traffic), configuration, and the pattern registry.
//!
//! Malformed log lines and unresolved captures are deliberately absent:
//! they are expected traffic and never surface as errors.

use std::process::ExitCode;

use thiserror::Error;

use crate::state::TrackedStateType;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The log-source supervisor hit a fatal condition.
    #[error("supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// Communication with the actuator failed.
    #[error("actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An extraction rule could not be built.
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),
}

impl Error {
    /// Process exit status used by the `shield-watcher` binary.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Supervisor(err) => err.exit_code(),
            Self::Config(_) | Self::Rule(_) => ExitCode::from(4),
            Self::Actuator(_) => ExitCode::from(5),
        }
    }
}

/// Errors raised while driving the external log source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The log tool is not installed or not on `PATH`.
    #[error("log tool `{0}` not found on PATH")]
    ToolNotFound(String),

    /// A helper command ran but reported failure.
    #[error("`{command}` failed: {detail}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit status or captured output.
        detail: String,
    },

    /// The streaming process did not expose a pipe it was asked for.
    #[error("log stream has no {0} pipe")]
    MissingPipe(&'static str),

    /// Operating-system I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal supervisor outcomes.
///
/// Everything else the supervisor encounters (process death, fatal markers
/// on stderr, spawn failures) is recovered by restarting the session.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The log tool could not be located at startup.
    #[error("log tool unavailable: {0}")]
    ToolMissing(#[source] SourceError),

    /// The first session could not be established under the fail-fast
    /// policy.
    #[error("could not connect to {address}: {source}")]
    Connect {
        /// The `host:port` that was dialled.
        address: String,
        /// Underlying failure.
        #[source]
        source: SourceError,
    },

    /// The stale log backlog could not be cleared before the first session.
    #[error("could not flush log backlog: {0}")]
    Flush(#[source] SourceError),
}

impl SupervisorError {
    /// Exit status for this failure.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::ToolMissing(_) => ExitCode::from(1),
            Self::Connect { .. } => ExitCode::from(2),
            Self::Flush(_) => ExitCode::from(3),
        }
    }
}

/// Errors related to actuator (HyperHDR) communication.
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// JSON body could not be decoded.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server rejected a JSON-RPC command.
    #[error("command `{command}` rejected: {reason}")]
    Rejected {
        /// The JSON-RPC command name.
        command: String,
        /// Error text reported by the server.
        reason: String,
    },

    /// A component was missing from the server info.
    #[error("component {0} not reported by server")]
    MissingComponent(String),

    /// The mirror worker is gone.
    #[error("actuator channel closed")]
    ChannelClosed,
}

/// Errors related to configuration loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Errors raised while building extraction rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule's pattern does not compile.
    #[error("invalid pattern for {source_id}: {error}")]
    Pattern {
        /// Source identifier the rule belongs to.
        source_id: String,
        /// Compilation error.
        #[source]
        error: regex::Error,
    },

    /// A resolution table refers to a group the pattern lacks.
    #[error("rule for {source_id} maps unknown capture group `{group}`")]
    UnknownGroup {
        /// Source identifier the rule belongs to.
        source_id: String,
        /// The missing group name.
        group: String,
    },

    /// A resolution table yields a value of the wrong state type.
    #[error("rule for {source_id} tracks {expected} but maps group `{group}` to {found}")]
    TypeMismatch {
        /// Source identifier the rule belongs to.
        source_id: String,
        /// Group whose table is inconsistent.
        group: String,
        /// The rule's tracked type.
        expected: TrackedStateType,
        /// The type of the offending value.
        found: TrackedStateType,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
