// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted log source for tests.
//!
//! [`ScriptedLogSource`] replays canned sessions instead of running a
//! process. Connection outcomes, flush outcome and the sessions handed out
//! by [`LogSource::spawn_stream`] are all configured up front, and every
//! call is counted so tests can assert on the lifecycle.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::SourceError;

use super::{LogSource, LogStream, StreamProcess};

/// One canned log session.
///
/// # Examples
///
/// ```
/// use shield_watcher::source::ScriptedSession;
///
/// let session = ScriptedSession::new()
///     .with_stdout_line("07-19 10:22:05.123 1234 5678 I PowerManagerService: Waking up")
///     .with_stderr_line("logcat: Unexpected EOF!");
/// let handle = session.handle();
/// assert!(handle.is_alive());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedSession {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    handle: SessionHandle,
}

impl ScriptedSession {
    /// Creates a live session with empty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line to the session's stdout.
    #[must_use]
    pub fn with_stdout_line(mut self, line: impl AsRef<[u8]>) -> Self {
        self.stdout.extend_from_slice(line.as_ref());
        self.stdout.push(b'\n');
        self
    }

    /// Appends a line to the session's stderr.
    #[must_use]
    pub fn with_stderr_line(mut self, line: impl AsRef<[u8]>) -> Self {
        self.stderr.extend_from_slice(line.as_ref());
        self.stderr.push(b'\n');
        self
    }

    /// Marks the session's process as already exited.
    #[must_use]
    pub fn exited(self) -> Self {
        self.handle.exit();
        self
    }

    /// Returns a handle controlling this session's process.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }
}

/// Controls the liveness of a scripted session's process.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    alive: Arc<AtomicBool>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl SessionHandle {
    /// Simulates process death.
    pub fn exit(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Returns `true` until the process exits or is terminated.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

struct ScriptedProcess {
    handle: SessionHandle,
}

impl StreamProcess for ScriptedProcess {
    fn has_exited(&mut self) -> bool {
        !self.handle.is_alive()
    }

    fn terminate(&mut self) {
        self.handle.exit();
    }
}

#[derive(Debug, Default)]
struct Inner {
    tool_missing: bool,
    connect_results: VecDeque<bool>,
    flush_fails: bool,
    sessions: VecDeque<ScriptedSession>,
    connect_calls: u32,
    flush_calls: u32,
    spawn_calls: u32,
}

/// A fake [`LogSource`] driven by canned sessions.
///
/// Connections succeed unless failures were queued with
/// [`with_connect_failures`](Self::with_connect_failures). Spawning fails
/// once all queued sessions are used up.
#[derive(Debug, Default)]
pub struct ScriptedLogSource {
    inner: Mutex<Inner>,
}

impl ScriptedLogSource {
    /// Identity reported by [`LogSource::target`].
    pub const TARGET: &'static str = "scripted:5555";

    /// Creates a source with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes [`LogSource::locate`] fail.
    #[must_use]
    pub fn without_tool(self) -> Self {
        self.inner.lock().tool_missing = true;
        self
    }

    /// Makes the next `count` connection attempts fail.
    #[must_use]
    pub fn with_connect_failures(self, count: usize) -> Self {
        self.fail_next_connects(count);
        self
    }

    /// Makes every backlog flush fail.
    #[must_use]
    pub fn with_failing_flush(self) -> Self {
        self.set_flush_failing(true);
        self
    }

    /// Makes the next `count` connection attempts fail while the source is
    /// in use.
    pub fn fail_next_connects(&self, count: usize) {
        self.inner
            .lock()
            .connect_results
            .extend(std::iter::repeat_n(false, count));
    }

    /// Switches backlog flush failures on or off while the source is in use.
    pub fn set_flush_failing(&self, failing: bool) {
        self.inner.lock().flush_fails = failing;
    }

    /// Queues a session for the next successful spawn.
    #[must_use]
    pub fn with_session(self, session: ScriptedSession) -> Self {
        self.push_session(session);
        self
    }

    /// Queues a session while the source is in use.
    pub fn push_session(&self, session: ScriptedSession) {
        self.inner.lock().sessions.push_back(session);
    }

    /// Returns the number of connection attempts so far.
    #[must_use]
    pub fn connect_calls(&self) -> u32 {
        self.inner.lock().connect_calls
    }

    /// Returns the number of backlog flushes so far.
    #[must_use]
    pub fn flush_calls(&self) -> u32 {
        self.inner.lock().flush_calls
    }

    /// Returns the number of spawn attempts so far.
    #[must_use]
    pub fn spawn_calls(&self) -> u32 {
        self.inner.lock().spawn_calls
    }

    /// Returns the number of queued sessions not yet spawned.
    #[must_use]
    pub fn remaining_sessions(&self) -> usize {
        self.inner.lock().sessions.len()
    }
}

impl LogSource for ScriptedLogSource {
    fn target(&self) -> &str {
        Self::TARGET
    }

    async fn locate(&self) -> Result<(), SourceError> {
        if self.inner.lock().tool_missing {
            Err(SourceError::ToolNotFound("adb".to_string()))
        } else {
            Ok(())
        }
    }

    async fn connect(&self) -> Result<(), SourceError> {
        let mut inner = self.inner.lock();
        inner.connect_calls += 1;
        if inner.connect_results.pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(SourceError::CommandFailed {
                command: format!("adb connect {}", Self::TARGET),
                detail: "failed to connect".to_string(),
            })
        }
    }

    async fn flush_backlog(&self) -> Result<(), SourceError> {
        let mut inner = self.inner.lock();
        inner.flush_calls += 1;
        if inner.flush_fails {
            Err(SourceError::CommandFailed {
                command: format!("adb -s {} logcat -c", Self::TARGET),
                detail: "exit status: 1".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn spawn_stream(&self) -> Result<LogStream, SourceError> {
        let mut inner = self.inner.lock();
        inner.spawn_calls += 1;
        let session = inner.sessions.pop_front().ok_or_else(|| {
            SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no scripted session left",
            ))
        })?;

        Ok(LogStream {
            stdout: Box::new(Cursor::new(session.stdout)),
            stderr: Box::new(Cursor::new(session.stderr)),
            process: Box::new(ScriptedProcess {
                handle: session.handle,
            }),
        })
    }
}
