// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in rules for the SHIELD TV log vocabulary.

use crate::error::RuleError;
use crate::state::{StateValue, TrackedStateType};
use crate::types::{HdrMode, PowerMode};

use super::{CaptureGroup, ExtractionRule};

/// Static declaration of one rule, compiled by [`rules`].
struct RuleSpec {
    source: &'static str,
    state_type: TrackedStateType,
    pattern: &'static str,
    groups: &'static [CaptureGroup],
}

const HDR_ON: StateValue = StateValue::Hdr(HdrMode::On);
const HDR_OFF: StateValue = StateValue::Hdr(HdrMode::Off);

const SMPTE_TYPE: &[(&str, StateValue)] = &[("Flip new", HDR_ON), ("Clear cached", HDR_OFF)];
const CLEARED: &[(&str, StateValue)] = &[("Clear cached", HDR_OFF)];
const MOONLIGHT_STATUS: &[(&str, StateValue)] = &[("enabled", HDR_ON)];
const SLEEP_MSG: &[(&str, StateValue)] = &[
    ("Sleeping", StateValue::Power(PowerMode::Sleeping)),
    ("Waking up", StateValue::Power(PowerMode::On)),
];

const SPECS: &[RuleSpec] = &[
    // Composer flips SMPTE ST 2086 mastering metadata when HDR starts and
    // clears it when HDR ends. Older builds omit the "HDR: " prefix.
    RuleSpec {
        source: "hwcomposer",
        state_type: TrackedStateType::Hdr,
        pattern: r"^(?:HDR: )?(?P<smpte_type>Clear cached|Flip new) SMPTE 2086 metadata",
        groups: &[CaptureGroup::table("smpte_type", SMPTE_TYPE)],
    },
    // Newer builds log any HDR activity under "HDR: "; only the cache clear means off.
    RuleSpec {
        source: "hwcomposer",
        state_type: TrackedStateType::Hdr,
        pattern: r"^HDR: (?:(?P<cleared>Clear cached)|(?P<signalled>.+))",
        groups: &[
            CaptureGroup::table("cleared", CLEARED),
            CaptureGroup::any("signalled", HDR_ON),
        ],
    },
    // Moonlight switches HDR on through its own path; hwcomposer still reports the switch off.
    RuleSpec {
        source: "com.limelight.LimeLog",
        state_type: TrackedStateType::Hdr,
        pattern: r"^Display HDR mode: (?P<status>\w*)$",
        groups: &[CaptureGroup::table("status", MOONLIGHT_STATUS)],
    },
    RuleSpec {
        source: "PowerManagerService",
        state_type: TrackedStateType::Power,
        pattern: r"^(?P<sleep_msg>Sleeping|Waking up)",
        groups: &[CaptureGroup::table("sleep_msg", SLEEP_MSG)],
    },
];

/// Compiles the built-in rule set.
pub(super) fn rules() -> Result<Vec<ExtractionRule>, RuleError> {
    SPECS
        .iter()
        .map(|spec| {
            ExtractionRule::new(
                spec.source,
                spec.state_type,
                spec.pattern,
                spec.groups.iter().copied(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_compile() {
        let rules = rules().unwrap();
        assert_eq!(rules.len(), SPECS.len());
    }

    /// Finds the one built-in rule for `source` that declares `group`.
    fn rule_with_group(source: &str, group: &str) -> ExtractionRule {
        let mut found: Vec<ExtractionRule> = rules()
            .unwrap()
            .into_iter()
            .filter(|rule| {
                rule.source() == source && rule.groups().iter().any(|g| g.name() == group)
            })
            .collect();
        assert_eq!(found.len(), 1, "expected one {source} rule with group `{group}`");
        found.remove(0)
    }

    #[test]
    fn hdr_prefix_without_clear_is_on() {
        let hdr_prefixed = rule_with_group("hwcomposer", "signalled");
        assert_eq!(hdr_prefixed.resolve("HDR: Flip new SMPTE 2086 metadata"), Some(HDR_ON));
        assert_eq!(hdr_prefixed.resolve("HDR: mode=HDR10"), Some(HDR_ON));
        assert_eq!(
            hdr_prefixed.resolve("HDR: Clear cached SMPTE 2086 metadata"),
            Some(HDR_OFF)
        );
        assert_eq!(hdr_prefixed.resolve("Flip new SMPTE 2086 metadata"), None);
    }

    #[test]
    fn smpte_rule_accepts_optional_prefix() {
        let smpte = rule_with_group("hwcomposer", "smpte_type");
        assert_eq!(smpte.resolve("Flip new SMPTE 2086 metadata"), Some(HDR_ON));
        assert_eq!(smpte.resolve("HDR: Clear cached SMPTE 2086 metadata"), Some(HDR_OFF));
        assert_eq!(smpte.resolve("HDR: mode=HDR10"), None);
    }
}
