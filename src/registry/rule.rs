// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extraction rules: a pattern plus fixed decision tables for its groups.

use std::sync::Arc;

use regex::Regex;

use crate::error::RuleError;
use crate::state::{StateValue, TrackedStateType};

/// How a capture group's text is turned into a state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Look the captured text up in a fixed table; unknown text resolves
    /// to nothing.
    Table(&'static [(&'static str, StateValue)]),
    /// Any non-empty capture resolves to this value.
    Any(StateValue),
}

/// A named capture group and its decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureGroup {
    name: &'static str,
    resolution: Resolution,
}

impl CaptureGroup {
    /// Group resolved through a lookup table.
    #[must_use]
    pub const fn table(name: &'static str, entries: &'static [(&'static str, StateValue)]) -> Self {
        Self {
            name,
            resolution: Resolution::Table(entries),
        }
    }

    /// Group that resolves to `value` whenever it captured anything.
    #[must_use]
    pub const fn any(name: &'static str, value: StateValue) -> Self {
        Self {
            name,
            resolution: Resolution::Any(value),
        }
    }

    /// Returns the group name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the group's resolution.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn values(&self) -> Vec<StateValue> {
        match self.resolution {
            Resolution::Table(entries) => entries.iter().map(|(_, value)| *value).collect(),
            Resolution::Any(value) => vec![value],
        }
    }

    fn resolve(&self, captured: &str) -> Option<StateValue> {
        if captured.is_empty() {
            return None;
        }
        match self.resolution {
            Resolution::Table(entries) => entries
                .iter()
                .find(|(key, _)| *key == captured)
                .map(|(_, value)| *value),
            Resolution::Any(value) => Some(value),
        }
    }
}

/// One compiled, validated extraction rule.
///
/// Construction checks that every group in the decision tables exists in
/// the pattern and that every mapped value belongs to the rule's tracked
/// type. A rule that builds can therefore only fail to resolve because the
/// log line said something else.
///
/// # Examples
///
/// ```
/// use shield_watcher::registry::{CaptureGroup, ExtractionRule};
/// use shield_watcher::state::{StateValue, TrackedStateType};
/// use shield_watcher::types::PowerMode;
///
/// const SLEEP_MSG: &[(&str, StateValue)] = &[
///     ("Sleeping", StateValue::Power(PowerMode::Sleeping)),
///     ("Waking up", StateValue::Power(PowerMode::On)),
/// ];
///
/// let rule = ExtractionRule::new(
///     "PowerManagerService",
///     TrackedStateType::Power,
///     r"^(?P<sleep_msg>Sleeping|Waking up)",
///     [CaptureGroup::table("sleep_msg", SLEEP_MSG)],
/// )
/// .unwrap();
///
/// assert_eq!(rule.resolve("Waking up (uid 1000)"), Some(StateValue::Power(PowerMode::On)));
/// assert_eq!(rule.resolve("Going to sleep"), None);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    source: Arc<str>,
    state_type: TrackedStateType,
    pattern: Regex,
    groups: Vec<CaptureGroup>,
}

impl ExtractionRule {
    /// Compiles and validates a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the pattern does not compile, a group is
    /// missing from the pattern, or a table maps to another state type.
    pub fn new(
        source: impl Into<Arc<str>>,
        state_type: TrackedStateType,
        pattern: &str,
        groups: impl IntoIterator<Item = CaptureGroup>,
    ) -> Result<Self, RuleError> {
        let source = source.into();
        let pattern = Regex::new(pattern).map_err(|error| RuleError::Pattern {
            source_id: source.to_string(),
            error,
        })?;
        let groups: Vec<CaptureGroup> = groups.into_iter().collect();

        for group in &groups {
            if !pattern.capture_names().flatten().any(|n| n == group.name) {
                return Err(RuleError::UnknownGroup {
                    source_id: source.to_string(),
                    group: group.name.to_string(),
                });
            }
            if let Some(bad) = group
                .values()
                .into_iter()
                .find(|value| value.state_type() != state_type)
            {
                return Err(RuleError::TypeMismatch {
                    source_id: source.to_string(),
                    group: group.name.to_string(),
                    expected: state_type,
                    found: bad.state_type(),
                });
            }
        }

        Ok(Self {
            source,
            state_type,
            pattern,
            groups,
        })
    }

    /// Returns the log source identifier this rule applies to.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the shared source identifier.
    #[must_use]
    pub(crate) fn source_arc(&self) -> &Arc<str> {
        &self.source
    }

    /// Returns the tracked type this rule updates.
    #[must_use]
    pub const fn state_type(&self) -> TrackedStateType {
        self.state_type
    }

    /// Returns the capture groups in resolution order.
    #[must_use]
    pub fn groups(&self) -> &[CaptureGroup] {
        &self.groups
    }

    /// Matches `message` and resolves its capture groups.
    ///
    /// Groups are visited in declaration order and a later resolving group
    /// overrides an earlier one. Returns `None` if the pattern does not
    /// match or no group resolves.
    #[must_use]
    pub fn resolve(&self, message: &str) -> Option<StateValue> {
        let caps = self.pattern.captures(message)?;
        // Last resolving group wins, so search from the back.
        self.groups
            .iter()
            .rev()
            .find_map(|group| caps.name(group.name).and_then(|m| group.resolve(m.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HdrMode, PowerMode};

    const SMPTE: &[(&str, StateValue)] = &[
        ("Flip new", StateValue::Hdr(HdrMode::On)),
        ("Clear cached", StateValue::Hdr(HdrMode::Off)),
    ];

    const STATUS: &[(&str, StateValue)] = &[("enabled", StateValue::Hdr(HdrMode::On))];

    #[test]
    fn resolves_table_entry() {
        let rule = ExtractionRule::new(
            "hwcomposer",
            TrackedStateType::Hdr,
            r"^(?P<smpte_type>Clear cached|Flip new) SMPTE 2086 metadata",
            [CaptureGroup::table("smpte_type", SMPTE)],
        )
        .unwrap();

        assert_eq!(
            rule.resolve("Clear cached SMPTE 2086 metadata"),
            Some(StateValue::Hdr(HdrMode::Off))
        );
        assert_eq!(rule.resolve("unrelated"), None);
    }

    #[test]
    fn match_without_resolving_group_is_none() {
        let rule = ExtractionRule::new(
            "com.limelight.LimeLog",
            TrackedStateType::Hdr,
            r"^Display HDR mode: (?P<status>\w*)$",
            [CaptureGroup::table("status", STATUS)],
        )
        .unwrap();

        assert_eq!(rule.resolve("Display HDR mode: disabled"), None);
        assert_eq!(rule.resolve("Display HDR mode: "), None);
        assert_eq!(
            rule.resolve("Display HDR mode: enabled"),
            Some(StateValue::Hdr(HdrMode::On))
        );
    }

    #[test]
    fn later_group_overrides_earlier() {
        let rule = ExtractionRule::new(
            "test",
            TrackedStateType::Hdr,
            r"^(?P<first>on) (?P<second>off)$",
            [
                CaptureGroup::any("first", StateValue::Hdr(HdrMode::On)),
                CaptureGroup::any("second", StateValue::Hdr(HdrMode::Off)),
            ],
        )
        .unwrap();

        assert_eq!(rule.resolve("on off"), Some(StateValue::Hdr(HdrMode::Off)));
    }

    #[test]
    fn unknown_group_is_rejected() {
        let err = ExtractionRule::new(
            "hwcomposer",
            TrackedStateType::Hdr,
            r"^(?P<kind>Flip new)",
            [CaptureGroup::table("smpte_type", SMPTE)],
        )
        .unwrap_err();

        assert!(matches!(err, RuleError::UnknownGroup { ref group, .. } if group == "smpte_type"));
    }

    #[test]
    fn mismatched_value_type_is_rejected() {
        let err = ExtractionRule::new(
            "PowerManagerService",
            TrackedStateType::Power,
            r"^(?P<smpte_type>Flip new)",
            [CaptureGroup::table("smpte_type", SMPTE)],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            RuleError::TypeMismatch {
                expected: TrackedStateType::Power,
                found: TrackedStateType::Hdr,
                ..
            }
        ));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = ExtractionRule::new(
            "PowerManagerService",
            TrackedStateType::Power,
            r"^(?P<broken",
            [CaptureGroup::any("broken", StateValue::Power(PowerMode::On))],
        )
        .unwrap_err();

        assert!(matches!(err, RuleError::Pattern { .. }));
    }
}
