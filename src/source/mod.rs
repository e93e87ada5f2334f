// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! External log sources.
//!
//! A [`LogSource`] knows how to reach the device and start a live log
//! stream. The supervisor drives it through the session lifecycle and
//! never touches processes directly, so the same state machine runs
//! against the real [`AdbLogSource`] or a [`ScriptedLogSource`].

mod adb;
mod scripted;

pub use adb::AdbLogSource;
pub use scripted::{ScriptedLogSource, ScriptedSession, SessionHandle};

use tokio::io::AsyncRead;

use crate::error::SourceError;

/// Boxed byte stream produced by a running log process.
pub type LogPipe = Box<dyn AsyncRead + Send + Unpin>;

/// Handle on the process behind a [`LogStream`].
pub trait StreamProcess: Send {
    /// Non-blocking liveness probe. Returns `true` once the process is gone.
    fn has_exited(&mut self) -> bool;

    /// Requests termination without waiting for it.
    fn terminate(&mut self);
}

/// A live log stream: its two output pipes plus the process producing them.
pub struct LogStream {
    /// Log lines.
    pub stdout: LogPipe,
    /// Diagnostics of the log tool itself.
    pub stderr: LogPipe,
    /// The producing process.
    pub process: Box<dyn StreamProcess>,
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream").finish_non_exhaustive()
    }
}

/// Trait for sources of device log streams.
#[allow(async_fn_in_trait)]
pub trait LogSource {
    /// Human-readable identity of the target device, used in logs and errors.
    fn target(&self) -> &str;

    /// Checks that the log tool is available.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ToolNotFound`] if the tool cannot be run.
    async fn locate(&self) -> Result<(), SourceError>;

    /// Establishes the session with the device.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the device could not be reached.
    async fn connect(&self) -> Result<(), SourceError>;

    /// Discards the log backlog so only new lines are streamed.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the backlog could not be cleared.
    async fn flush_backlog(&self) -> Result<(), SourceError>;

    /// Starts streaming new log lines.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the stream process could not be started.
    fn spawn_stream(&self) -> Result<LogStream, SourceError>;
}
