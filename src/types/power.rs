// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device power mode.

use std::fmt;

/// Power mode of the watched device.
///
/// Variants are ordered by activity level (`Off < Sleeping < On`). The
/// engine itself only ever compares modes for equality.
///
/// # Examples
///
/// ```
/// use shield_watcher::types::PowerMode;
///
/// assert!(PowerMode::Sleeping < PowerMode::On);
/// assert_eq!(PowerMode::Sleeping.as_str(), "SLEEPING");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    /// Device is powered off (or unknown at startup).
    #[default]
    Off,
    /// Screen off, device in standby.
    Sleeping,
    /// Device is awake.
    On,
}

impl PowerMode {
    /// Returns the uppercase label used in log output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Sleeping => "SLEEPING",
            Self::On => "ON",
        }
    }

    /// Returns `true` for [`PowerMode::On`].
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
