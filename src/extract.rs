// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State extraction: parsed log records in, state updates out.

use std::sync::Arc;

use crate::channel::UpdateSender;
use crate::parser::{self, LogRecord};
use crate::registry::PatternRegistry;
use crate::state::StateUpdate;

/// Applies registry rules to log records.
///
/// Cheap to clone; every stdout tail task holds one.
///
/// # Examples
///
/// ```
/// use shield_watcher::extract::Extractor;
/// use shield_watcher::state::StateValue;
/// use shield_watcher::types::PowerMode;
///
/// let extractor = Extractor::builtin();
/// let updates =
///     extractor.extract_line(b"07-19 10:22:05.123 1234 5678 I PowerManagerService: Sleeping");
///
/// assert_eq!(updates.len(), 1);
/// assert_eq!(updates[0].value(), StateValue::Power(PowerMode::Sleeping));
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    registry: Arc<PatternRegistry>,
}

impl Extractor {
    /// Creates an extractor over `registry`.
    #[must_use]
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    /// Creates an extractor over the built-in registry.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(PatternRegistry::builtin())
    }

    /// Returns the registry in use.
    #[must_use]
    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Resolves every rule registered for the record's source.
    ///
    /// Yields at most one update per tracked type: when several rules for
    /// the same type resolve on one line, the last one wins.
    #[must_use]
    pub fn extract(&self, record: &LogRecord<'_>) -> Vec<StateUpdate> {
        let mut updates: Vec<StateUpdate> = Vec::new();

        for rule in self.registry.rules_for(record.source) {
            let Some(value) = rule.resolve(record.message) else {
                continue;
            };
            let update = StateUpdate::new(Arc::clone(rule.source_arc()), value);
            match updates
                .iter_mut()
                .find(|existing| existing.state_type() == update.state_type())
            {
                Some(existing) => *existing = update,
                None => updates.push(update),
            }
        }

        updates
    }

    /// Parses a raw line and extracts its updates.
    ///
    /// Lines that fail to parse yield nothing.
    #[must_use]
    pub fn extract_line(&self, raw: &[u8]) -> Vec<StateUpdate> {
        match parser::parse_line(raw) {
            Some(record) => self.extract(&record),
            None => {
                tracing::trace!(len = raw.len(), "Discarding unparsable log line");
                Vec::new()
            }
        }
    }

    /// Parses, extracts and enqueues the updates of one raw line.
    ///
    /// Returns the number of updates enqueued. Updates are dropped if the
    /// reconciler side of the channel is gone.
    pub fn process_line(&self, raw: &[u8], sender: &UpdateSender) -> usize {
        let mut sent = 0;
        for update in self.extract_line(raw) {
            tracing::debug!(source = %update.source(), value = %update.value(), "State update extracted");
            if sender.send(update).is_err() {
                tracing::debug!("Update channel closed, dropping update");
                break;
            }
            sent += 1;
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::update_channel;
    use crate::registry::{CaptureGroup, ExtractionRule};
    use crate::state::StateValue;
    use crate::types::{HdrMode, PowerMode};

    fn single(line: &str) -> Option<StateValue> {
        let updates = Extractor::builtin().extract_line(line.as_bytes());
        assert!(updates.len() <= 1, "expected at most one update: {updates:?}");
        updates.first().map(StateUpdate::value)
    }

    #[test]
    fn flip_new_without_prefix_is_hdr_on() {
        assert_eq!(
            single("07-19 10:22:05.123 1234 5678 I hwcomposer: Flip new SMPTE 2086 metadata"),
            Some(StateValue::Hdr(HdrMode::On))
        );
    }

    #[test]
    fn hdr_prefix_is_hdr_on() {
        assert_eq!(
            single("07-19 10:22:05.123 1234 5678 I hwcomposer: HDR: Flip new SMPTE 2086 metadata"),
            Some(StateValue::Hdr(HdrMode::On))
        );
        assert_eq!(
            single("07-19 10:22:05.123 1234 5678 I hwcomposer: HDR: type=2 (HDR10)"),
            Some(StateValue::Hdr(HdrMode::On))
        );
    }

    #[test]
    fn clear_cached_is_hdr_off() {
        assert_eq!(
            single("07-19 10:22:05.123 1234 5678 I hwcomposer: HDR: Clear cached SMPTE 2086 metadata"),
            Some(StateValue::Hdr(HdrMode::Off))
        );
        assert_eq!(
            single("07-19 10:22:05.123 1234 5678 I hwcomposer: Clear cached SMPTE 2086 metadata"),
            Some(StateValue::Hdr(HdrMode::Off))
        );
    }

    #[test]
    fn moonlight_enabled_is_hdr_on() {
        assert_eq!(
            single("07-19 10:22:05.123 4242 4250 I com.limelight.LimeLog: Display HDR mode: enabled"),
            Some(StateValue::Hdr(HdrMode::On))
        );
        assert_eq!(
            single("07-19 10:22:05.123 4242 4250 I com.limelight.LimeLog: Display HDR mode: disabled"),
            None
        );
    }

    #[test]
    fn power_manager_messages() {
        assert_eq!(
            single("07-19 23:01:00.000 612 701 I PowerManagerService: Sleeping (uid 1000)..."),
            Some(StateValue::Power(PowerMode::Sleeping))
        );
        assert_eq!(
            single("07-20 07:30:00.000 612 701 I PowerManagerService: Waking up from sleep (uid 1000)..."),
            Some(StateValue::Power(PowerMode::On))
        );
    }

    #[test]
    fn untracked_source_yields_nothing() {
        assert_eq!(
            single("07-19 10:22:05.123 1234 5678 I ActivityManager: Sleeping"),
            None
        );
    }

    #[test]
    fn malformed_line_yields_nothing() {
        assert_eq!(single("hwcomposer: Flip new SMPTE 2086 metadata"), None);
        assert_eq!(single(""), None);
    }

    #[test]
    fn record_level_extract() {
        let record = parser::parse_str(
            "07-19 10:22:05.123 1234 5678 I PowerManagerService: Waking up",
        )
        .unwrap();
        let updates = Extractor::builtin().extract(&record);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].source(), "PowerManagerService");
    }

    #[test]
    fn one_update_per_type_last_rule_wins() {
        const ON: &[(&str, StateValue)] = &[("on", StateValue::Hdr(HdrMode::On))];
        const OFF: &[(&str, StateValue)] = &[("on", StateValue::Hdr(HdrMode::Off))];
        const WAKE: &[(&str, StateValue)] = &[("on", StateValue::Power(PowerMode::On))];

        fn panel_rule(table: &'static [(&'static str, StateValue)]) -> ExtractionRule {
            ExtractionRule::new(
                "panel",
                table[0].1.state_type(),
                r"^(?P<word>on)$",
                [CaptureGroup::table("word", table)],
            )
            .unwrap()
        }

        let registry = PatternRegistry::from_rules([panel_rule(ON), panel_rule(WAKE), panel_rule(OFF)]);
        let extractor = Extractor::new(Arc::new(registry));

        let updates = extractor.extract_line(b"07-19 10:22:05.123 1 2 I panel: on");
        let values: Vec<StateValue> = updates.iter().map(StateUpdate::value).collect();
        assert_eq!(
            values,
            vec![StateValue::Hdr(HdrMode::Off), StateValue::Power(PowerMode::On)]
        );
    }

    #[test]
    fn process_line_enqueues_updates() {
        let (tx, mut rx) = update_channel();
        let extractor = Extractor::builtin();

        let sent = extractor.process_line(
            b"07-19 10:22:05.123 1234 5678 I hwcomposer: Flip new SMPTE 2086 metadata\n",
            &tx,
        );
        assert_eq!(sent, 1);
        assert_eq!(extractor.process_line(b"garbage\n", &tx), 0);

        let drained = rx.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].value(), StateValue::Hdr(HdrMode::On));
    }

    #[test]
    fn process_line_with_closed_channel_sends_nothing() {
        let (tx, rx) = update_channel();
        drop(rx);
        let sent = Extractor::builtin().process_line(
            b"07-19 10:22:05.123 1234 5678 I PowerManagerService: Sleeping",
            &tx,
        );
        assert_eq!(sent, 0);
    }
}
