// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The closed set of tracked properties and their values.

use std::fmt;

use crate::types::{HdrMode, PowerMode};

/// Kind of device property the watcher tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedStateType {
    /// Display HDR mode.
    Hdr,
    /// Device power mode.
    Power,
}

impl TrackedStateType {
    /// Every tracked type, in reconciliation order.
    pub const ALL: [Self; 2] = [Self::Hdr, Self::Power];

    /// Returns the lowercase name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hdr => "hdr",
            Self::Power => "power",
        }
    }
}

impl fmt::Display for TrackedStateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value of one tracked property.
///
/// The variant determines the [`TrackedStateType`], so a value can never be
/// filed under the wrong property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StateValue {
    /// HDR mode value.
    Hdr(HdrMode),
    /// Power mode value.
    Power(PowerMode),
}

impl StateValue {
    /// Returns the property this value belongs to.
    #[must_use]
    pub const fn state_type(&self) -> TrackedStateType {
        match self {
            Self::Hdr(_) => TrackedStateType::Hdr,
            Self::Power(_) => TrackedStateType::Power,
        }
    }

    /// Returns the HDR mode if this is an HDR value.
    #[must_use]
    pub const fn as_hdr(&self) -> Option<HdrMode> {
        match self {
            Self::Hdr(mode) => Some(*mode),
            Self::Power(_) => None,
        }
    }

    /// Returns the power mode if this is a power value.
    #[must_use]
    pub const fn as_power(&self) -> Option<PowerMode> {
        match self {
            Self::Power(mode) => Some(*mode),
            Self::Hdr(_) => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hdr(mode) => write!(f, "hdr={mode}"),
            Self::Power(mode) => write!(f, "power={mode}"),
        }
    }
}

impl From<HdrMode> for StateValue {
    fn from(mode: HdrMode) -> Self {
        Self::Hdr(mode)
    }
}

impl From<PowerMode> for StateValue {
    fn from(mode: PowerMode) -> Self {
        Self::Power(mode)
    }
}
