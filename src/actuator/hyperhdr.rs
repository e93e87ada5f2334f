// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HyperHDR JSON-RPC client.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::ActuatorError;

use super::rpc::{Reply, Request};
use super::{Actuator, Component, ServerInfo};

// ============================================================================
// HyperHdrConfig - Connection parameters
// ============================================================================

/// Configuration for a HyperHDR server.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use shield_watcher::actuator::HyperHdrConfig;
///
/// let config = HyperHdrConfig::new("192.168.1.30")
///     .with_port(8091)
///     .with_timeout(Duration::from_secs(2));
///
/// assert_eq!(config.url(), "http://192.168.1.30:8091/json-rpc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperHdrConfig {
    host: String,
    port: u16,
    timeout: Duration,
}

impl HyperHdrConfig {
    /// Default JSON-RPC port.
    pub const DEFAULT_PORT: u16 = 8090;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration for the server at `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the JSON-RPC endpoint URL.
    ///
    /// A host given with an explicit `http://` or `https://` scheme is
    /// used as is, port included.
    #[must_use]
    pub fn url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}/json-rpc", self.host.trim_end_matches('/'))
        } else {
            format!("http://{}:{}/json-rpc", self.host, self.port)
        }
    }

    /// Creates a client from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<HyperHdrClient, ActuatorError> {
        let client = Client::builder().timeout(self.timeout).build()?;
        Ok(HyperHdrClient {
            url: self.url(),
            client,
        })
    }
}

// ============================================================================
// HyperHdrClient - JSON-RPC over HTTP
// ============================================================================

/// Client for HyperHDR's `/json-rpc` endpoint.
///
/// Each call is an independent `POST`; there is no session to keep alive.
///
/// # Examples
///
/// ```no_run
/// use shield_watcher::actuator::{Actuator, Component, HyperHdrConfig};
///
/// # async fn example() -> Result<(), shield_watcher::error::ActuatorError> {
/// let client = HyperHdrConfig::new("192.168.1.30").into_client()?;
/// client.set_component_enabled(Component::LedDevice, true).await?;
/// let info = client.server_info().await?;
/// println!("HDR enabled: {}", info.is_enabled(Component::Hdr)?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HyperHdrClient {
    url: String,
    client: Client,
}

impl HyperHdrClient {
    /// Creates a client for `host` on the default port.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(host: impl Into<String>) -> Result<Self, ActuatorError> {
        HyperHdrConfig::new(host).into_client()
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, request: &Request) -> Result<Option<T>, ActuatorError> {
        tracing::debug!(url = %self.url, command = request.command(), "Sending JSON-RPC request");

        let response = self.client.post(&self.url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(ActuatorError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        tracing::trace!(body = %body, "Received JSON-RPC response");

        let reply: Reply<T> = serde_json::from_str(&body)?;
        if !reply.success {
            return Err(ActuatorError::Rejected {
                command: request.command().to_string(),
                reason: reply.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(reply.info)
    }
}

impl Actuator for HyperHdrClient {
    async fn server_info(&self) -> Result<ServerInfo, ActuatorError> {
        let info = self.call::<ServerInfo>(&Request::ServerInfo).await?;
        Ok(info.unwrap_or_default())
    }

    async fn set_component_enabled(
        &self,
        component: Component,
        enabled: bool,
    ) -> Result<(), ActuatorError> {
        self.call::<serde::de::IgnoredAny>(&Request::component_state(component, enabled))
            .await?;
        tracing::debug!(component = %component, enabled, "Component state set");
        Ok(())
    }
}
