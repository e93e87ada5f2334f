// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Watcher configuration.
//!
//! [`WatcherConfig`] can be built in code with `with_*` methods, or loaded
//! from the process environment (and a `.env` file, if present) with
//! [`WatcherConfig::from_env`].
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `SHIELD_IP_ADDRESS` | required | device address |
//! | `SHIELD_ADB_PORT` | `5555` | adb-over-TCP port |
//! | `HYPERHDR_IP_ADDRESS` | required | HyperHDR address |
//! | `HYPERHDR_PORT` | `8090` | HyperHDR JSON-RPC port |
//! | `SHIELD_CONNECT_POLICY` | `retry` | `retry` or `fail-fast` |
//! | `SHIELD_CONNECT_BACKOFF_SECS` | `5` | pause between connection attempts |
//! | `SHIELD_WATCH_STDERR` | `true` | restart on `logcat: Unexpected EOF!` |
//! | `SHIELD_TICK_MILLIS` | `50` | reconciliation cadence |

use std::time::Duration;

#[cfg(feature = "http")]
use crate::actuator::HyperHdrConfig;
use crate::error::ConfigError;
use crate::source::AdbLogSource;
use crate::supervisor::{ConnectPolicy, SupervisorConfig};

/// Environment variable names.
pub mod vars {
    /// Device address.
    pub const SHIELD_IP_ADDRESS: &str = "SHIELD_IP_ADDRESS";
    /// adb port.
    pub const SHIELD_ADB_PORT: &str = "SHIELD_ADB_PORT";
    /// HyperHDR address.
    pub const HYPERHDR_IP_ADDRESS: &str = "HYPERHDR_IP_ADDRESS";
    /// HyperHDR port.
    pub const HYPERHDR_PORT: &str = "HYPERHDR_PORT";
    /// Connection policy.
    pub const SHIELD_CONNECT_POLICY: &str = "SHIELD_CONNECT_POLICY";
    /// Retry pause in seconds.
    pub const SHIELD_CONNECT_BACKOFF_SECS: &str = "SHIELD_CONNECT_BACKOFF_SECS";
    /// Fatal marker detection switch.
    pub const SHIELD_WATCH_STDERR: &str = "SHIELD_WATCH_STDERR";
    /// Tick period in milliseconds.
    pub const SHIELD_TICK_MILLIS: &str = "SHIELD_TICK_MILLIS";
}

/// Everything the watcher binary needs to run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use shield_watcher::config::WatcherConfig;
/// use shield_watcher::supervisor::ConnectPolicy;
///
/// let config = WatcherConfig::new("192.168.1.20", "192.168.1.30")
///     .with_connect_policy(ConnectPolicy::FailFast)
///     .with_tick(Duration::from_millis(100));
///
/// assert_eq!(config.adb_port(), 5555);
/// assert_eq!(config.hyperhdr_port(), 8090);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    shield_host: String,
    adb_port: u16,
    hyperhdr_host: String,
    hyperhdr_port: u16,
    connect_policy: ConnectPolicy,
    watch_stderr: bool,
    tick: Duration,
}

impl WatcherConfig {
    /// Default reconciliation cadence.
    pub const DEFAULT_TICK: Duration = Duration::from_millis(50);
    /// Default HyperHDR JSON-RPC port.
    pub const DEFAULT_HYPERHDR_PORT: u16 = 8090;

    /// Creates a configuration with defaults for everything but the hosts.
    #[must_use]
    pub fn new(shield_host: impl Into<String>, hyperhdr_host: impl Into<String>) -> Self {
        Self {
            shield_host: shield_host.into(),
            adb_port: AdbLogSource::DEFAULT_PORT,
            hyperhdr_host: hyperhdr_host.into(),
            hyperhdr_port: Self::DEFAULT_HYPERHDR_PORT,
            connect_policy: ConnectPolicy::default(),
            watch_stderr: true,
            tick: Self::DEFAULT_TICK,
        }
    }

    /// Loads `.env` (if present) and reads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "Could not load .env file"),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut config = Self::new(required(vars::SHIELD_IP_ADDRESS)?, required(vars::HYPERHDR_IP_ADDRESS)?);

        if let Some(value) = get(vars::SHIELD_ADB_PORT) {
            config.adb_port = parse_number(vars::SHIELD_ADB_PORT, &value)?;
        }
        if let Some(value) = get(vars::HYPERHDR_PORT) {
            config.hyperhdr_port = parse_number(vars::HYPERHDR_PORT, &value)?;
        }

        let backoff = match get(vars::SHIELD_CONNECT_BACKOFF_SECS) {
            Some(value) => Duration::from_secs(parse_number(vars::SHIELD_CONNECT_BACKOFF_SECS, &value)?),
            None => ConnectPolicy::DEFAULT_BACKOFF,
        };
        config.connect_policy = match get(vars::SHIELD_CONNECT_POLICY) {
            None => ConnectPolicy::retry_every(backoff),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "retry" => ConnectPolicy::retry_every(backoff),
                "fail-fast" | "failfast" => ConnectPolicy::FailFast,
                _ => return Err(invalid(vars::SHIELD_CONNECT_POLICY, value)),
            },
        };

        if let Some(value) = get(vars::SHIELD_WATCH_STDERR) {
            config.watch_stderr = parse_bool(vars::SHIELD_WATCH_STDERR, value)?;
        }
        if let Some(value) = get(vars::SHIELD_TICK_MILLIS) {
            let millis: u64 = parse_number(vars::SHIELD_TICK_MILLIS, &value)?;
            if millis == 0 {
                return Err(invalid(vars::SHIELD_TICK_MILLIS, value));
            }
            config.tick = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Sets the adb port.
    #[must_use]
    pub fn with_adb_port(mut self, port: u16) -> Self {
        self.adb_port = port;
        self
    }

    /// Sets the HyperHDR port.
    #[must_use]
    pub fn with_hyperhdr_port(mut self, port: u16) -> Self {
        self.hyperhdr_port = port;
        self
    }

    /// Sets the connection policy.
    #[must_use]
    pub fn with_connect_policy(mut self, policy: ConnectPolicy) -> Self {
        self.connect_policy = policy;
        self
    }

    /// Enables or disables restarting on fatal stderr markers.
    #[must_use]
    pub fn with_stderr_watch(mut self, enabled: bool) -> Self {
        self.watch_stderr = enabled;
        self
    }

    /// Sets the reconciliation cadence.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Returns the device host.
    #[must_use]
    pub fn shield_host(&self) -> &str {
        &self.shield_host
    }

    /// Returns the adb port.
    #[must_use]
    pub const fn adb_port(&self) -> u16 {
        self.adb_port
    }

    /// Returns the HyperHDR host.
    #[must_use]
    pub fn hyperhdr_host(&self) -> &str {
        &self.hyperhdr_host
    }

    /// Returns the HyperHDR port.
    #[must_use]
    pub const fn hyperhdr_port(&self) -> u16 {
        self.hyperhdr_port
    }

    /// Returns the connection policy.
    #[must_use]
    pub const fn connect_policy(&self) -> ConnectPolicy {
        self.connect_policy
    }

    /// Returns whether fatal stderr markers trigger a restart.
    #[must_use]
    pub const fn watch_stderr(&self) -> bool {
        self.watch_stderr
    }

    /// Returns the reconciliation cadence.
    #[must_use]
    pub const fn tick(&self) -> Duration {
        self.tick
    }

    /// Builds the adb log source for the configured device.
    #[must_use]
    pub fn log_source(&self) -> AdbLogSource {
        AdbLogSource::new(&self.shield_host, self.adb_port)
    }

    /// Builds the supervisor configuration.
    #[must_use]
    pub fn supervisor(&self) -> SupervisorConfig {
        let config = SupervisorConfig::new().with_policy(self.connect_policy);
        if self.watch_stderr {
            config
        } else {
            config.without_fatal_markers()
        }
    }

    /// Builds the HyperHDR client configuration.
    #[cfg(feature = "http")]
    #[must_use]
    pub fn hyperhdr(&self) -> HyperHdrConfig {
        HyperHdrConfig::new(&self.hyperhdr_host).with_port(self.hyperhdr_port)
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { name, value }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(name, value.to_string()))
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}
