// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory actuator for tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ActuatorError;

use super::{Actuator, Component, ServerInfo};

#[derive(Debug, Default)]
struct Inner {
    info: Option<ServerInfo>,
    history: Vec<(Component, bool)>,
}

/// Actuator that records every component change.
///
/// Cloning shares the record, so a test can hand one clone to the mirror
/// worker and inspect another. Component changes are also reflected in the
/// reported [`ServerInfo`].
///
/// # Examples
///
/// ```
/// use shield_watcher::actuator::{Actuator, Component, RecordingActuator};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let actuator = RecordingActuator::new();
/// actuator.set_component_enabled(Component::Hdr, true).await.unwrap();
/// assert_eq!(actuator.history(), vec![(Component::Hdr, true)]);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RecordingActuator {
    inner: Arc<Mutex<Inner>>,
}

impl Default for RecordingActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingActuator {
    /// Creates an actuator whose server reports all three components off.
    #[must_use]
    pub fn new() -> Self {
        Self::with_info(ServerInfo::from_components([
            (Component::Hdr, false),
            (Component::LedDevice, false),
            (Component::VideoGrabber, false),
        ]))
    }

    /// Creates an actuator reporting `info`.
    #[must_use]
    pub fn with_info(info: ServerInfo) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                info: Some(info),
                history: Vec::new(),
            })),
        }
    }

    /// Creates an actuator whose server cannot be reached.
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Returns every component change so far, in order.
    #[must_use]
    pub fn history(&self) -> Vec<(Component, bool)> {
        self.inner.lock().history.clone()
    }

    fn unreachable_error() -> ActuatorError {
        ActuatorError::Status(503)
    }
}

impl Actuator for RecordingActuator {
    async fn server_info(&self) -> Result<ServerInfo, ActuatorError> {
        self.inner
            .lock()
            .info
            .clone()
            .ok_or_else(Self::unreachable_error)
    }

    async fn set_component_enabled(
        &self,
        component: Component,
        enabled: bool,
    ) -> Result<(), ActuatorError> {
        let mut inner = self.inner.lock();
        let info = inner.info.as_mut().ok_or_else(Self::unreachable_error)?;
        match info
            .components
            .iter_mut()
            .find(|status| status.name == component.as_str())
        {
            Some(status) => status.enabled = enabled,
            None => {
                return Err(ActuatorError::Rejected {
                    command: "componentstate".to_string(),
                    reason: format!("unknown component {component}"),
                });
            }
        }
        inner.history.push((component, enabled));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn changes_are_reflected_in_server_info() {
        let actuator = RecordingActuator::new();
        actuator
            .set_component_enabled(Component::LedDevice, true)
            .await
            .unwrap();

        let info = actuator.server_info().await.unwrap();
        assert!(info.is_enabled(Component::LedDevice).unwrap());
        assert!(!info.is_enabled(Component::Hdr).unwrap());
    }

    #[tokio::test]
    async fn unreachable_fails_everything() {
        let actuator = RecordingActuator::unreachable();
        assert!(actuator.server_info().await.is_err());
        assert!(
            actuator
                .set_component_enabled(Component::Hdr, false)
                .await
                .is_err()
        );
        assert!(actuator.history().is_empty());
    }

    #[tokio::test]
    async fn unknown_component_is_rejected() {
        let actuator = RecordingActuator::with_info(ServerInfo::default());
        let err = actuator
            .set_component_enabled(Component::VideoGrabber, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ActuatorError::Rejected { .. }));
    }
}
