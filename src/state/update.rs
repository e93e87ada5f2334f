// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Proposed state changes derived from log lines.

use std::sync::Arc;

use super::{StateValue, TrackedStateType};

/// A proposed new value for one tracked property.
///
/// Updates are produced by the extractor, carried through the update
/// channel, and consumed exactly once by the reconciler. They have no
/// identity beyond their position in the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    /// Log source identifier that produced the update.
    source: Arc<str>,
    /// The proposed value.
    value: StateValue,
}

impl StateUpdate {
    /// Creates an update proposed by `source`.
    #[must_use]
    pub fn new(source: impl Into<Arc<str>>, value: impl Into<StateValue>) -> Self {
        Self {
            source: source.into(),
            value: value.into(),
        }
    }

    /// Returns the property this update targets.
    #[must_use]
    pub const fn state_type(&self) -> TrackedStateType {
        self.value.state_type()
    }

    /// Returns the proposed value.
    #[must_use]
    pub const fn value(&self) -> StateValue {
        self.value
    }

    /// Returns the log source identifier that produced the update.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HdrMode, PowerMode};

    #[test]
    fn update_type_follows_value() {
        let update = StateUpdate::new("PowerManagerService", PowerMode::Sleeping);
        assert_eq!(update.state_type(), TrackedStateType::Power);
        assert_eq!(update.value(), StateValue::Power(PowerMode::Sleeping));
        assert_eq!(update.source(), "PowerManagerService");
    }

    #[test]
    fn updates_compare_by_source_and_value() {
        let a = StateUpdate::new("hwcomposer", HdrMode::On);
        let b = StateUpdate::new("hwcomposer", HdrMode::On);
        let c = StateUpdate::new("com.limelight.LimeLog", HdrMode::On);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
