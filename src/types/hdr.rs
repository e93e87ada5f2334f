// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display HDR mode.

use std::fmt;

/// Whether the device is currently outputting an HDR signal.
///
/// # Examples
///
/// ```
/// use shield_watcher::types::HdrMode;
///
/// assert_eq!(HdrMode::from(true), HdrMode::On);
/// assert!(HdrMode::On.is_on());
/// assert_eq!(HdrMode::Off.as_str(), "OFF");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HdrMode {
    /// SDR output.
    #[default]
    Off,
    /// HDR output (HDR10, Dolby Vision or HLG metadata present).
    On,
}

impl HdrMode {
    /// Returns the uppercase label used in log output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::On => "ON",
        }
    }

    /// Returns `true` for [`HdrMode::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for HdrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for HdrMode {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}
