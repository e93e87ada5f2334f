// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Committed state of every tracked property.

use crate::types::{HdrMode, PowerMode};

use super::{StateUpdate, StateValue, TrackedStateType};

/// The last committed value of every tracked property.
///
/// There is exactly one entry per [`TrackedStateType`] at all times: each
/// property is a plain field, so "unknown" cannot be represented. Callers
/// seed the table with the best available knowledge at startup.
///
/// # Examples
///
/// ```
/// use shield_watcher::state::{CurrentStateTable, StateValue};
/// use shield_watcher::types::{HdrMode, PowerMode};
///
/// let mut table = CurrentStateTable::default();
/// assert!(table.set(StateValue::Power(PowerMode::On)));
/// assert!(!table.set(StateValue::Power(PowerMode::On)));
/// assert_eq!(table.power(), PowerMode::On);
/// assert_eq!(table.hdr(), HdrMode::Off);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CurrentStateTable {
    hdr: HdrMode,
    power: PowerMode,
}

impl CurrentStateTable {
    /// Creates a table seeded with the given values.
    #[must_use]
    pub const fn new(hdr: HdrMode, power: PowerMode) -> Self {
        Self { hdr, power }
    }

    /// Returns the committed HDR mode.
    #[must_use]
    pub const fn hdr(&self) -> HdrMode {
        self.hdr
    }

    /// Returns the committed power mode.
    #[must_use]
    pub const fn power(&self) -> PowerMode {
        self.power
    }

    /// Returns the value stored for `state_type`.
    #[must_use]
    pub const fn get(&self, state_type: TrackedStateType) -> StateValue {
        match state_type {
            TrackedStateType::Hdr => StateValue::Hdr(self.hdr),
            TrackedStateType::Power => StateValue::Power(self.power),
        }
    }

    /// Overwrites the entry for the value's type.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set(&mut self, value: StateValue) -> bool {
        let changed = self.get(value.state_type()) != value;
        match value {
            StateValue::Hdr(mode) => self.hdr = mode,
            StateValue::Power(mode) => self.power = mode,
        }
        changed
    }

    /// Applies an update. Returns `true` if the stored value changed.
    pub fn apply(&mut self, update: &StateUpdate) -> bool {
        self.set(update.value())
    }

    /// Returns `(type, new, old)` for every property that differs from `previous`.
    #[must_use]
    pub fn diff(&self, previous: &Self) -> Vec<(TrackedStateType, StateValue, StateValue)> {
        TrackedStateType::ALL
            .into_iter()
            .filter_map(|state_type| {
                let new = self.get(state_type);
                let old = previous.get(state_type);
                (new != old).then_some((state_type, new, old))
            })
            .collect()
    }
}
