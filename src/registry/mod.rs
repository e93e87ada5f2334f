// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pattern registry: which log sources carry state, and how to read it.
//!
//! The registry maps a log source identifier (the `logcat` tag) to an
//! ordered list of [`ExtractionRule`]s. It is plain immutable data once
//! built, so it is shared behind an [`Arc`] by every tail task.
//!
//! # Examples
//!
//! ```
//! use shield_watcher::registry::PatternRegistry;
//!
//! let registry = PatternRegistry::builtin();
//! assert!(!registry.rules_for("hwcomposer").is_empty());
//! assert!(registry.rules_for("ActivityManager").is_empty());
//! ```

mod builtin;
mod rule;

pub use rule::{CaptureGroup, ExtractionRule, Resolution};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::RuleError;

/// Lookup table from log source identifier to extraction rules.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    rules: HashMap<Arc<str>, Vec<ExtractionRule>>,
}

impl PatternRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared built-in registry.
    ///
    /// # Panics
    ///
    /// Panics if a built-in rule is malformed; the unit tests cover every
    /// built-in rule.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        static BUILTIN: OnceLock<Arc<PatternRegistry>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                let rules = builtin::rules().expect("built-in rules should be valid");
                Arc::new(Self::from_rules(rules))
            })
            .clone()
    }

    /// Builds a registry from compiled rules, keeping their order per source.
    #[must_use]
    pub fn from_rules(rules: impl IntoIterator<Item = ExtractionRule>) -> Self {
        let mut registry = Self::new();
        for rule in rules {
            registry.insert(rule);
        }
        registry
    }

    /// Adds a rule after any existing rules for the same source.
    #[must_use]
    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.insert(rule);
        self
    }

    /// Compiles the built-in rules into a fresh, extendable registry.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if a built-in rule is malformed.
    pub fn with_builtin_rules() -> Result<Self, RuleError> {
        Ok(Self::from_rules(builtin::rules()?))
    }

    fn insert(&mut self, rule: ExtractionRule) {
        self.rules
            .entry(Arc::clone(rule.source_arc()))
            .or_default()
            .push(rule);
    }

    /// Returns the rules for `source`, or an empty slice if it is untracked.
    #[must_use]
    pub fn rules_for(&self, source: &str) -> &[ExtractionRule] {
        self.rules.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the tracked source identifiers.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|source| &**source)
    }

    /// Returns the total number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    /// Returns `true` if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
