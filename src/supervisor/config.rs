// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Supervisor policies.

use std::time::Duration;

/// What to do when the device session cannot be established.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use shield_watcher::supervisor::ConnectPolicy;
///
/// let policy = ConnectPolicy::default();
/// assert_eq!(policy.backoff(), Some(Duration::from_secs(5)));
///
/// assert_eq!(ConnectPolicy::FailFast.backoff(), None);
/// assert_eq!(ConnectPolicy::FailFast.restart_backoff(), ConnectPolicy::DEFAULT_BACKOFF);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPolicy {
    /// Keep retrying after `backoff`, never giving up.
    RetryForever {
        /// Pause between attempts.
        backoff: Duration,
    },
    /// Give up on the first failure.
    FailFast,
}

impl ConnectPolicy {
    /// Default pause between connection attempts.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

    /// Creates a retrying policy with the given pause.
    #[must_use]
    pub const fn retry_every(backoff: Duration) -> Self {
        Self::RetryForever { backoff }
    }

    /// Returns the pause between attempts, or `None` when failing fast.
    #[must_use]
    pub const fn backoff(&self) -> Option<Duration> {
        match self {
            Self::RetryForever { backoff } => Some(*backoff),
            Self::FailFast => None,
        }
    }

    /// Returns the pause before retrying a session lost after streaming
    /// started.
    ///
    /// Failing fast only applies to the first session, so restarts under
    /// [`FailFast`](Self::FailFast) wait [`DEFAULT_BACKOFF`](Self::DEFAULT_BACKOFF).
    #[must_use]
    pub const fn restart_backoff(&self) -> Duration {
        match self {
            Self::RetryForever { backoff } => *backoff,
            Self::FailFast => Self::DEFAULT_BACKOFF,
        }
    }
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self::retry_every(Self::DEFAULT_BACKOFF)
    }
}

/// Configuration for the [`Supervisor`](super::Supervisor).
///
/// # Examples
///
/// ```
/// use shield_watcher::supervisor::{ConnectPolicy, SupervisorConfig};
///
/// let config = SupervisorConfig::new()
///     .with_policy(ConnectPolicy::FailFast)
///     .without_fatal_markers();
/// assert!(config.fatal_markers().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    policy: ConnectPolicy,
    fatal_markers: Vec<String>,
}

impl SupervisorConfig {
    /// Marker `logcat` prints on stderr when its connection is lost.
    pub const DEFAULT_FATAL_MARKER: &'static str = "logcat: Unexpected EOF!";

    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Adds a stderr substring that forces a restart.
    #[must_use]
    pub fn with_fatal_marker(mut self, marker: impl Into<String>) -> Self {
        self.fatal_markers.push(marker.into());
        self
    }

    /// Disables stderr marker detection.
    #[must_use]
    pub fn without_fatal_markers(mut self) -> Self {
        self.fatal_markers.clear();
        self
    }

    /// Returns the connection policy.
    #[must_use]
    pub const fn policy(&self) -> ConnectPolicy {
        self.policy
    }

    /// Returns the stderr markers; empty means stderr is ignored.
    #[must_use]
    pub fn fatal_markers(&self) -> &[String] {
        &self.fatal_markers
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            policy: ConnectPolicy::default(),
            fatal_markers: vec![Self::DEFAULT_FATAL_MARKER.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_watches_logcat_eof() {
        let config = SupervisorConfig::default();
        assert_eq!(config.policy(), ConnectPolicy::default());
        assert_eq!(config.fatal_markers(), ["logcat: Unexpected EOF!"]);
    }

    #[test]
    fn markers_can_be_replaced() {
        let config = SupervisorConfig::new()
            .without_fatal_markers()
            .with_fatal_marker("error: device offline");
        assert_eq!(config.fatal_markers(), ["error: device offline"]);
    }

    #[test]
    fn retry_policy_backoff() {
        let policy = ConnectPolicy::retry_every(Duration::from_millis(250));
        assert_eq!(policy.backoff(), Some(Duration::from_millis(250)));
        assert_eq!(policy.restart_backoff(), Duration::from_millis(250));
    }

    #[test]
    fn fail_fast_still_backs_off_on_restart() {
        assert_eq!(
            ConnectPolicy::FailFast.restart_backoff(),
            ConnectPolicy::DEFAULT_BACKOFF
        );
    }
}
