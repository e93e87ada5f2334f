// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drain-and-commit reconciliation.
//!
//! The [`Reconciler`] owns the [`CurrentStateTable`] and the
//! [`CallbackTable`]. Each [`Reconciler::reconcile`] pass drains every
//! buffered update, folds them into a working copy of the table, fires one
//! callback per property whose value differs from the pre-drain value, and
//! commits.
//!
//! Transitions are edge-triggered across passes: a value that goes `A -> B
//! -> A` inside a single drain produces no callback.
//!
//! # Examples
//!
//! ```
//! use shield_watcher::channel::update_channel;
//! use shield_watcher::reconciler::Reconciler;
//! use shield_watcher::state::{CurrentStateTable, StateUpdate};
//! use shield_watcher::types::{HdrMode, PowerMode};
//!
//! let (tx, rx) = update_channel();
//! let mut reconciler = Reconciler::new(CurrentStateTable::default(), rx);
//! reconciler.callbacks_mut().on_power_changed(|new, old| {
//!     println!("power {old} -> {new}");
//!     Ok(())
//! });
//!
//! tx.send(StateUpdate::new("PowerManagerService", PowerMode::On)).unwrap();
//! tx.send(StateUpdate::new("hwcomposer", HdrMode::Off)).unwrap();
//!
//! let report = reconciler.reconcile();
//! assert_eq!(report.applied, 2);
//! assert_eq!(report.transitions.len(), 1);
//! assert_eq!(reconciler.state().power(), PowerMode::On);
//! ```

mod callback;

pub use callback::{CallbackError, CallbackFault, CallbackResult, CallbackTable};

use crate::channel::UpdateReceiver;
use crate::state::{CurrentStateTable, StateUpdate, StateValue, TrackedStateType};

/// A committed change of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The property that changed.
    pub state_type: TrackedStateType,
    /// Committed value after the pass.
    pub new: StateValue,
    /// Committed value before the pass.
    pub old: StateValue,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Number of updates drained and folded into the table.
    pub applied: usize,
    /// Properties whose committed value changed, in fixed type order.
    pub transitions: Vec<Transition>,
    /// Number of callbacks that failed or panicked.
    pub faults: usize,
}

impl ReconcileReport {
    /// Returns `true` if nothing was drained.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.applied == 0
    }
}

/// Sole owner of the committed state table.
#[derive(Debug)]
pub struct Reconciler {
    state: CurrentStateTable,
    callbacks: CallbackTable,
    receiver: UpdateReceiver,
}

impl Reconciler {
    /// Creates a reconciler seeded with `initial` that drains `receiver`.
    #[must_use]
    pub fn new(initial: CurrentStateTable, receiver: UpdateReceiver) -> Self {
        Self {
            state: initial,
            callbacks: CallbackTable::new(),
            receiver,
        }
    }

    /// Returns the committed state.
    #[must_use]
    pub const fn state(&self) -> &CurrentStateTable {
        &self.state
    }

    /// Returns the callback table for registration.
    ///
    /// Exclusive access means registration can never interleave with a
    /// running pass.
    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        &mut self.callbacks
    }

    /// Drains the channel and reconciles everything that was buffered.
    pub fn reconcile(&mut self) -> ReconcileReport {
        let updates = self.receiver.drain();
        self.apply_batch(updates)
    }

    /// Reconciles an explicit batch of updates, in order.
    pub fn apply_batch(&mut self, updates: impl IntoIterator<Item = StateUpdate>) -> ReconcileReport {
        let previous = self.state;
        let mut working = previous;
        let mut report = ReconcileReport::default();

        for update in updates {
            tracing::trace!(
                source = %update.source(),
                value = %update.value(),
                "Applying state update"
            );
            working.apply(&update);
            report.applied += 1;
        }

        for (state_type, new, old) in working.diff(&previous) {
            tracing::info!(state = %state_type, old = %old, new = %new, "State changed");

            if let Some(Err(fault)) = self.callbacks.invoke(state_type, new, old) {
                tracing::warn!(state = %state_type, error = %fault, "State callback failed");
                report.faults += 1;
            }

            report.transitions.push(Transition {
                state_type,
                new,
                old,
            });
        }

        self.state = working;
        report
    }
}
