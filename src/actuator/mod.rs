// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Actuators that mirror the tracked state.
//!
//! The only real actuator is a HyperHDR server reached over its JSON-RPC
//! endpoint ([`HyperHdrClient`], behind the `http` feature). The
//! [`Actuator`] trait keeps the mirror worker and state seeding testable
//! with a [`RecordingActuator`].
//!
//! # Components
//!
//! HyperHDR exposes toggleable components. Three of them are driven here:
//!
//! - [`Component::Hdr`]: HDR tone mapping
//! - [`Component::LedDevice`]: the LED output
//! - [`Component::VideoGrabber`]: the capture device

#[cfg(feature = "http")]
mod hyperhdr;
mod recording;
mod rpc;

#[cfg(feature = "http")]
pub use hyperhdr::{HyperHdrClient, HyperHdrConfig};
pub use recording::RecordingActuator;
pub use rpc::{ComponentStatus, ServerInfo};

use std::fmt;
use std::future::Future;

use crate::error::ActuatorError;

/// A HyperHDR component that can be switched on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Component {
    /// HDR tone mapping.
    #[serde(rename = "HDR")]
    Hdr,
    /// LED output device.
    #[serde(rename = "LEDDEVICE")]
    LedDevice,
    /// Video capture device.
    #[serde(rename = "VIDEOGRABBER")]
    VideoGrabber,
}

impl Component {
    /// Returns the component name used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hdr => "HDR",
            Self::LedDevice => "LEDDEVICE",
            Self::VideoGrabber => "VIDEOGRABBER",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for actuators that can switch components and report their state.
///
/// The returned futures are `Send` so a mirror worker can run on any
/// runtime thread.
pub trait Actuator {
    /// Fetches the server's current component states.
    ///
    /// # Errors
    ///
    /// Returns `ActuatorError` if the server cannot be reached or answers
    /// with something unexpected.
    fn server_info(&self) -> impl Future<Output = Result<ServerInfo, ActuatorError>> + Send;

    /// Enables or disables a component.
    ///
    /// # Errors
    ///
    /// Returns `ActuatorError` if the request fails or is rejected.
    fn set_component_enabled(
        &self,
        component: Component,
        enabled: bool,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_wire_names() {
        assert_eq!(Component::Hdr.as_str(), "HDR");
        assert_eq!(Component::LedDevice.to_string(), "LEDDEVICE");
        assert_eq!(
            serde_json::to_string(&Component::VideoGrabber).unwrap(),
            "\"VIDEOGRABBER\""
        );
    }
}
