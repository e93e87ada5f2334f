// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Log source supervision.
//!
//! The [`Supervisor`] owns the lifecycle of the external log stream. It
//! locates the log tool once, then cycles through
//! [`SupervisorState`]s: connect (under a [`ConnectPolicy`]), flush the
//! backlog, spawn the stream and tail it, and re-establish the session
//! whenever the process dies or reports a fatal condition on stderr.
//!
//! The supervisor never blocks on the stream itself. Two background tasks
//! per session read stdout (feeding the extractor) and stderr (watching for
//! fatal markers); [`Supervisor::step`] only polls their outcome, waiting
//! briefly for a dead session's stdout to reach EOF.
//!
//! The [`ConnectPolicy`] governs the first session only. Once streaming has
//! started, losing the session is never fatal: each step makes at most one
//! attempt to re-establish it, and failed attempts are retried after the
//! policy's backoff without holding up the caller.

mod config;
mod state;
mod tail;

pub use config::{ConnectPolicy, SupervisorConfig};
pub use state::{FailureReason, SupervisorState};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::UpdateSender;
use crate::error::SupervisorError;
use crate::extract::Extractor;
use crate::source::{LogSource, LogStream, StreamProcess};

/// How long a dead session's stdout may take to hit EOF.
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// A running session: the process and its tail tasks.
struct Session {
    process: Box<dyn StreamProcess>,
    stdout_task: JoinHandle<u64>,
    stderr_task: JoinHandle<()>,
    fatal: Arc<AtomicBool>,
}

impl Session {
    fn failure(&mut self) -> Option<FailureReason> {
        if self.fatal.load(Ordering::Acquire) {
            Some(FailureReason::FatalMarker)
        } else if self.process.has_exited() {
            Some(FailureReason::Exited)
        } else {
            None
        }
    }

    /// Kills the process and lets the stdout tail finish what was already
    /// written before it died.
    async fn drain(mut self) {
        self.process.terminate();
        match tokio::time::timeout(DRAIN_TIMEOUT, &mut self.stdout_task).await {
            Ok(Ok(lines)) => tracing::debug!(lines, "Log stdout drained"),
            Ok(Err(err)) => tracing::debug!(error = %err, "Log stdout tail failed"),
            Err(_) => tracing::debug!(timeout = ?DRAIN_TIMEOUT, "Log stdout still open, abandoning it"),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stdout_task.abort();
        self.stderr_task.abort();
        self.process.terminate();
    }
}

/// Drives a [`LogSource`] through its session lifecycle.
///
/// # Examples
///
/// ```
/// use shield_watcher::channel::update_channel;
/// use shield_watcher::extract::Extractor;
/// use shield_watcher::source::{ScriptedLogSource, ScriptedSession};
/// use shield_watcher::supervisor::{Supervisor, SupervisorConfig, SupervisorState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), shield_watcher::error::SupervisorError> {
/// let source = ScriptedLogSource::new().with_session(ScriptedSession::new());
/// let (tx, _rx) = update_channel();
///
/// let mut supervisor = Supervisor::new(source, Extractor::builtin(), tx, SupervisorConfig::default());
/// supervisor.start().await?;
/// assert_eq!(supervisor.state(), SupervisorState::Streaming);
/// # Ok(())
/// # }
/// ```
pub struct Supervisor<S> {
    source: S,
    extractor: Extractor,
    sender: UpdateSender,
    config: SupervisorConfig,
    markers: Arc<[String]>,
    state: SupervisorState,
    session: Option<Session>,
    restarts: u32,
    attempt: u32,
    retry_at: Option<Instant>,
}

impl<S: LogSource> Supervisor<S> {
    /// Creates a supervisor in the `Disconnected` state.
    #[must_use]
    pub fn new(source: S, extractor: Extractor, sender: UpdateSender, config: SupervisorConfig) -> Self {
        let markers = Arc::from(config.fatal_markers());
        Self {
            source,
            extractor,
            sender,
            config,
            markers,
            state: SupervisorState::Disconnected,
            session: None,
            restarts: 0,
            attempt: 1,
            retry_at: None,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SupervisorState {
        self.state
    }

    /// Returns how many times a session has been re-established.
    #[must_use]
    pub const fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Returns the underlying log source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the supervisor configuration.
    #[must_use]
    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Locates the log tool and establishes the first session.
    ///
    /// The connection is attempted under the configured [`ConnectPolicy`].
    /// A failure to spawn the stream is not fatal: the supervisor is left
    /// `Failed` and [`step`](Self::step) retries after the backoff.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::ToolMissing`] if the log tool is not
    /// available, [`SupervisorError::Connect`] under
    /// [`ConnectPolicy::FailFast`], and [`SupervisorError::Flush`] if the
    /// backlog cannot be cleared.
    pub async fn start(&mut self) -> Result<SupervisorState, SupervisorError> {
        self.source
            .locate()
            .await
            .map_err(SupervisorError::ToolMissing)?;
        tracing::debug!(target_device = %self.source.target(), "Log tool located");

        self.session = None;
        self.connect_first().await?;
        self.source
            .flush_backlog()
            .await
            .map_err(SupervisorError::Flush)?;
        self.spawn();
        Ok(self.state)
    }

    /// Advances the state machine by one liveness check.
    ///
    /// While streaming, detects process death and fatal markers and moves
    /// to `Failed`, after letting the dead stream's stdout drain. Otherwise
    /// makes one attempt to re-establish the session, unless a previous
    /// attempt failed and its backoff has not elapsed yet. Never waits out
    /// a backoff and never fails: a session that cannot be re-established
    /// is retried on a later step.
    pub async fn step(&mut self) -> SupervisorState {
        match self.state {
            SupervisorState::Streaming => self.check_liveness().await,
            SupervisorState::Disconnected
            | SupervisorState::Connecting { .. }
            | SupervisorState::Failed(_) => {
                if self.retry_at.is_none_or(|at| Instant::now() >= at) {
                    self.reestablish().await;
                }
            }
        }
        self.state
    }

    /// Tears down the running session, if any, and returns to `Disconnected`.
    pub fn stop(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!(target_device = %self.source.target(), "Log session stopped");
        }
        self.state = SupervisorState::Disconnected;
        self.retry_at = None;
    }

    async fn check_liveness(&mut self) {
        let reason = match self.session.as_mut() {
            Some(session) => session.failure(),
            None => {
                self.state = SupervisorState::Disconnected;
                return;
            }
        };
        let Some(reason) = reason else {
            return;
        };

        tracing::warn!(
            target_device = %self.source.target(),
            reason = %reason,
            "Log session ended, restarting"
        );
        if let Some(session) = self.session.take() {
            session.drain().await;
        }
        self.state = SupervisorState::Failed(reason);
        self.retry_at = None;
    }

    async fn reestablish(&mut self) {
        self.session = None;
        self.state = SupervisorState::Connecting {
            attempt: self.attempt,
        };

        let failure = match self.source.connect().await {
            Err(err) => Some((FailureReason::ConnectFailed, err)),
            Ok(()) => self
                .source
                .flush_backlog()
                .await
                .err()
                .map(|err| (FailureReason::FlushFailed, err)),
        };
        if let Some((reason, err)) = failure {
            tracing::warn!(
                target_device = %self.source.target(),
                attempt = self.attempt,
                error = %err,
                "Could not re-establish log session"
            );
            self.back_off(reason);
            return;
        }

        self.spawn();
        if self.state.is_streaming() {
            self.restarts += 1;
        }
    }

    fn spawn(&mut self) {
        match self.source.spawn_stream() {
            Ok(stream) => {
                self.session = Some(self.attach(stream));
                self.state = SupervisorState::Streaming;
                self.attempt = 1;
                self.retry_at = None;
                tracing::info!(target_device = %self.source.target(), "Log stream started");
            }
            Err(err) => {
                tracing::warn!(
                    target_device = %self.source.target(),
                    error = %err,
                    "Could not start log stream"
                );
                self.back_off(FailureReason::SpawnFailed);
            }
        }
    }

    fn back_off(&mut self, reason: FailureReason) {
        self.state = SupervisorState::Failed(reason);
        self.retry_at = Some(Instant::now() + self.config.policy().restart_backoff());
        self.attempt = self.attempt.saturating_add(1);
    }

    /// Connects under the configured policy, retrying in place if allowed.
    async fn connect_first(&mut self) -> Result<(), SupervisorError> {
        let mut attempt = 1;
        loop {
            self.state = SupervisorState::Connecting { attempt };
            let Err(err) = self.source.connect().await else {
                return Ok(());
            };

            match self.config.policy() {
                ConnectPolicy::FailFast => {
                    self.state = SupervisorState::Disconnected;
                    return Err(SupervisorError::Connect {
                        address: self.source.target().to_string(),
                        source: err,
                    });
                }
                ConnectPolicy::RetryForever { backoff } => {
                    tracing::warn!(
                        target_device = %self.source.target(),
                        attempt,
                        error = %err,
                        retry_in = ?backoff,
                        "Could not connect to device"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    fn attach(&self, stream: LogStream) -> Session {
        let LogStream {
            stdout,
            stderr,
            process,
        } = stream;

        let stdout_task = tokio::spawn(tail::tail_stdout(
            stdout,
            self.extractor.clone(),
            self.sender.clone(),
        ));

        // Stderr is drained even without markers so the pipe never fills.
        let fatal = Arc::new(AtomicBool::new(false));
        let stderr_task = tokio::spawn(tail::watch_stderr(
            stderr,
            Arc::clone(&self.markers),
            Arc::clone(&fatal),
        ));

        Session {
            process,
            stdout_task,
            stderr_task,
            fatal,
        }
    }
}

impl<S> std::fmt::Debug for Supervisor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("state", &self.state)
            .field("restarts", &self.restarts)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::channel::{UpdateReceiver, update_channel};
    use crate::error::SourceError;
    use crate::source::{ScriptedLogSource, ScriptedSession};
    use crate::state::StateValue;
    use crate::types::{HdrMode, PowerMode};

    const WAKE: &str = "07-19 10:22:05.123 1000 1000 I PowerManagerService: Waking up";
    const HDR_ON: &str = "07-19 10:22:06.000 1234 5678 I hwcomposer: Flip new SMPTE 2086 metadata";
    const SLEEP: &str = "07-19 10:22:07.000 1000 1000 I PowerManagerService: Sleeping";

    fn supervisor(
        source: ScriptedLogSource,
        config: SupervisorConfig,
    ) -> (Supervisor<ScriptedLogSource>, UpdateReceiver) {
        let (tx, rx) = update_channel();
        (Supervisor::new(source, Extractor::builtin(), tx, config), rx)
    }

    /// Lets the tail tasks run on the current-thread runtime.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn start_reaches_streaming_and_tails_stdout() {
        let source = ScriptedLogSource::new()
            .with_session(ScriptedSession::new().with_stdout_line(WAKE));
        let (mut supervisor, mut rx) = supervisor(source, SupervisorConfig::default());

        assert_eq!(supervisor.state(), SupervisorState::Disconnected);
        assert_eq!(supervisor.start().await.unwrap(), SupervisorState::Streaming);
        assert_eq!(supervisor.source().flush_calls(), 1);

        settle().await;
        let updates = rx.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value(), StateValue::Power(PowerMode::On));
    }

    #[tokio::test]
    async fn missing_tool_is_fatal() {
        let source = ScriptedLogSource::new().without_tool();
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, SupervisorError::ToolMissing(SourceError::ToolNotFound(_))));
        assert_eq!(supervisor.source().connect_calls(), 0);
    }

    #[tokio::test]
    async fn fail_fast_reports_connect_error() {
        let source = ScriptedLogSource::new().with_connect_failures(1);
        let config = SupervisorConfig::new().with_policy(ConnectPolicy::FailFast);
        let (mut supervisor, _rx) = supervisor(source, config);

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, SupervisorError::Connect { ref address, .. } if address == "scripted:5555"));
        assert_eq!(supervisor.state(), SupervisorState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_forever_waits_between_attempts() {
        let source = ScriptedLogSource::new()
            .with_connect_failures(3)
            .with_session(ScriptedSession::new());
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        let started = tokio::time::Instant::now();
        assert_eq!(supervisor.start().await.unwrap(), SupervisorState::Streaming);
        assert_eq!(supervisor.source().connect_calls(), 4);
        assert!(started.elapsed() >= ConnectPolicy::DEFAULT_BACKOFF * 3);
    }

    #[tokio::test]
    async fn flush_failure_is_fatal() {
        let source = ScriptedLogSource::new()
            .with_failing_flush()
            .with_session(ScriptedSession::new());
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, SupervisorError::Flush(_)));
        assert_eq!(supervisor.source().spawn_calls(), 0);
    }

    #[tokio::test]
    async fn process_death_restarts_stream() {
        let first = ScriptedSession::new().with_stdout_line(WAKE);
        let first_handle = first.handle();
        let source = ScriptedLogSource::new()
            .with_session(first)
            .with_session(ScriptedSession::new().with_stdout_line(HDR_ON));
        let (mut supervisor, mut rx) = supervisor(source, SupervisorConfig::default());

        supervisor.start().await.unwrap();
        settle().await;
        assert_eq!(rx.drain().len(), 1);

        // Still alive: stepping is a no-op.
        assert_eq!(supervisor.step().await, SupervisorState::Streaming);

        first_handle.exit();
        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::Exited)
        );
        assert_eq!(supervisor.step().await, SupervisorState::Streaming);
        assert_eq!(supervisor.restarts(), 1);
        assert_eq!(supervisor.source().connect_calls(), 2);
        assert_eq!(supervisor.source().flush_calls(), 2);

        settle().await;
        let updates = rx.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value(), StateValue::Hdr(HdrMode::On));
    }

    #[tokio::test]
    async fn fatal_marker_forces_restart_and_kills_process() {
        let first = ScriptedSession::new().with_stderr_line("logcat: Unexpected EOF!");
        let first_handle = first.handle();
        let source = ScriptedLogSource::new()
            .with_session(first)
            .with_session(ScriptedSession::new());
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        supervisor.start().await.unwrap();
        settle().await;

        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::FatalMarker)
        );
        assert!(!first_handle.is_alive());
        assert_eq!(supervisor.step().await, SupervisorState::Streaming);
    }

    #[tokio::test]
    async fn fatal_marker_ignored_when_disabled() {
        let source = ScriptedLogSource::new()
            .with_session(ScriptedSession::new().with_stderr_line("logcat: Unexpected EOF!"));
        let config = SupervisorConfig::new().without_fatal_markers();
        let (mut supervisor, _rx) = supervisor(source, config);

        supervisor.start().await.unwrap();
        settle().await;
        assert_eq!(supervisor.step().await, SupervisorState::Streaming);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_failure_backs_off_and_retries() {
        let source = ScriptedLogSource::new();
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        assert_eq!(
            supervisor.start().await.unwrap(),
            SupervisorState::Failed(FailureReason::SpawnFailed)
        );

        supervisor.source().push_session(ScriptedSession::new());
        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::SpawnFailed)
        );
        assert_eq!(supervisor.source().spawn_calls(), 1);

        tokio::time::advance(ConnectPolicy::DEFAULT_BACKOFF).await;
        assert_eq!(supervisor.step().await, SupervisorState::Streaming);
        assert_eq!(supervisor.source().spawn_calls(), 2);
        assert_eq!(supervisor.restarts(), 1);
    }

    #[tokio::test]
    async fn lines_written_before_exit_are_not_lost() {
        let session = ScriptedSession::new().with_stdout_line(SLEEP);
        let handle = session.handle();
        let source = ScriptedLogSource::new()
            .with_session(session)
            .with_session(ScriptedSession::new());
        let (mut supervisor, mut rx) = supervisor(source, SupervisorConfig::default());

        supervisor.start().await.unwrap();
        handle.exit();
        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::Exited)
        );

        let updates = rx.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value(), StateValue::Power(PowerMode::Sleeping));
    }

    #[tokio::test(start_paused = true)]
    async fn fail_fast_only_guards_the_first_session() {
        let first = ScriptedSession::new();
        let first_handle = first.handle();
        let source = ScriptedLogSource::new()
            .with_session(first)
            .with_session(ScriptedSession::new());
        let config = SupervisorConfig::new().with_policy(ConnectPolicy::FailFast);
        let (mut supervisor, _rx) = supervisor(source, config);

        assert_eq!(supervisor.start().await.unwrap(), SupervisorState::Streaming);

        first_handle.exit();
        supervisor.source().fail_next_connects(1);
        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::Exited)
        );
        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::ConnectFailed)
        );

        tokio::time::advance(ConnectPolicy::DEFAULT_BACKOFF).await;
        assert_eq!(supervisor.step().await, SupervisorState::Streaming);
        assert_eq!(supervisor.source().connect_calls(), 3);
        assert_eq!(supervisor.restarts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_failure_on_restart_is_retried() {
        let first = ScriptedSession::new();
        let first_handle = first.handle();
        let source = ScriptedLogSource::new()
            .with_session(first)
            .with_session(ScriptedSession::new());
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        supervisor.start().await.unwrap();
        first_handle.exit();
        supervisor.source().set_flush_failing(true);
        supervisor.step().await;
        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::FlushFailed)
        );

        supervisor.source().set_flush_failing(false);
        tokio::time::advance(ConnectPolicy::DEFAULT_BACKOFF).await;
        assert_eq!(supervisor.step().await, SupervisorState::Streaming);
        assert_eq!(supervisor.source().flush_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn step_returns_immediately_while_backing_off() {
        let first = ScriptedSession::new();
        let first_handle = first.handle();
        let source = ScriptedLogSource::new()
            .with_session(first)
            .with_session(ScriptedSession::new());
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        supervisor.start().await.unwrap();
        first_handle.exit();
        supervisor.source().fail_next_connects(1);
        supervisor.step().await;
        assert_eq!(
            supervisor.step().await,
            SupervisorState::Failed(FailureReason::ConnectFailed)
        );

        let started = tokio::time::Instant::now();
        for _ in 0..3 {
            assert_eq!(
                supervisor.step().await,
                SupervisorState::Failed(FailureReason::ConnectFailed)
            );
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(supervisor.source().connect_calls(), 2);
    }

    #[tokio::test]
    async fn stop_kills_running_session() {
        let session = ScriptedSession::new();
        let handle = session.handle();
        let source = ScriptedLogSource::new().with_session(session);
        let (mut supervisor, _rx) = supervisor(source, SupervisorConfig::default());

        supervisor.start().await.unwrap();
        supervisor.stop();
        assert_eq!(supervisor.state(), SupervisorState::Disconnected);
        assert!(!handle.is_alive());
    }
}
