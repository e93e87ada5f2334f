// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HyperHDR JSON-RPC message models.

use serde::{Deserialize, Serialize};

use crate::error::ActuatorError;

use super::Component;

/// Requests understood by the JSON-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub(crate) enum Request {
    /// Full server state dump.
    ServerInfo,
    /// Toggle one component.
    ComponentState {
        #[serde(rename = "componentstate")]
        component_state: ComponentState,
    },
}

impl Request {
    pub(crate) fn component_state(component: Component, enabled: bool) -> Self {
        Self::ComponentState {
            component_state: ComponentState {
                component,
                state: enabled,
            },
        }
    }

    /// The `command` field value, for error reporting.
    pub(crate) const fn command(&self) -> &'static str {
        match self {
            Self::ServerInfo => "serverinfo",
            Self::ComponentState { .. } => "componentstate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ComponentState {
    component: Component,
    state: bool,
}

/// Response envelope shared by every command.
#[derive(Debug, Deserialize)]
pub(crate) struct Reply<T> {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
    pub info: Option<T>,
}

/// State of one component as reported by `serverinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Wire name, e.g. `"LEDDEVICE"`.
    pub name: String,
    /// Whether the component is active.
    pub enabled: bool,
}

/// The subset of `serverinfo` this crate relies on.
///
/// # Examples
///
/// ```
/// use shield_watcher::actuator::{Component, ServerInfo};
///
/// let info: ServerInfo = serde_json::from_str(
///     r#"{"components":[{"name":"LEDDEVICE","enabled":true},{"name":"HDR","enabled":false}]}"#,
/// )
/// .unwrap();
///
/// assert!(info.is_enabled(Component::LedDevice).unwrap());
/// assert!(!info.is_enabled(Component::Hdr).unwrap());
/// assert!(info.is_enabled(Component::VideoGrabber).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Every component the server knows, in server order.
    #[serde(default)]
    pub components: Vec<ComponentStatus>,
}

impl ServerInfo {
    /// Creates server info from `(component, enabled)` pairs.
    #[must_use]
    pub fn from_components(components: impl IntoIterator<Item = (Component, bool)>) -> Self {
        Self {
            components: components
                .into_iter()
                .map(|(component, enabled)| ComponentStatus {
                    name: component.as_str().to_string(),
                    enabled,
                })
                .collect(),
        }
    }

    /// Looks a component up by name.
    #[must_use]
    pub fn component(&self, component: Component) -> Option<&ComponentStatus> {
        self.components
            .iter()
            .find(|status| status.name == component.as_str())
    }

    /// Returns whether `component` is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::MissingComponent`] if the server did not
    /// report it.
    pub fn is_enabled(&self, component: Component) -> Result<bool, ActuatorError> {
        self.component(component)
            .map(|status| status.enabled)
            .ok_or_else(|| ActuatorError::MissingComponent(component.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serverinfo_request_body() {
        assert_eq!(
            serde_json::to_value(Request::ServerInfo).unwrap(),
            json!({"command": "serverinfo"})
        );
    }

    #[test]
    fn componentstate_request_body() {
        assert_eq!(
            serde_json::to_value(Request::component_state(Component::LedDevice, true)).unwrap(),
            json!({
                "command": "componentstate",
                "componentstate": {"component": "LEDDEVICE", "state": true}
            })
        );
    }

    #[test]
    fn reply_with_info() {
        let reply: Reply<ServerInfo> = serde_json::from_value(json!({
            "command": "serverinfo",
            "success": true,
            "tan": 0,
            "info": {
                "components": [
                    {"name": "ALL", "enabled": true},
                    {"name": "HDR", "enabled": true},
                    {"name": "LEDDEVICE", "enabled": false}
                ],
                "hostname": "hyperhdr"
            }
        }))
        .unwrap();

        assert!(reply.success);
        let info = reply.info.unwrap();
        assert!(info.is_enabled(Component::Hdr).unwrap());
        assert!(!info.is_enabled(Component::LedDevice).unwrap());
    }

    #[test]
    fn reply_with_error() {
        let reply: Reply<ServerInfo> = serde_json::from_value(json!({
            "command": "componentstate",
            "success": false,
            "error": "Component not found"
        }))
        .unwrap();

        assert!(!reply.success);
        assert_eq!(reply.error.as_deref(), Some("Component not found"));
        assert!(reply.info.is_none());
    }

    #[test]
    fn lookup_is_by_name_not_position() {
        let info = ServerInfo::from_components([
            (Component::VideoGrabber, false),
            (Component::LedDevice, true),
        ]);
        assert!(info.is_enabled(Component::LedDevice).unwrap());
        assert!(matches!(
            info.is_enabled(Component::Hdr),
            Err(ActuatorError::MissingComponent(ref name)) if name == "HDR"
        ));
    }
}
