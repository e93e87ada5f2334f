// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-type transition callbacks.
//!
//! Each tracked type has at most one subscriber. Subscribers receive
//! `(new, old)` and may fail, either by returning an error or by
//! panicking; both are contained here so a faulty subscriber can never
//! abort reconciliation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::state::{StateValue, TrackedStateType};
use crate::types::{HdrMode, PowerMode};

/// Error type subscribers may return.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by subscribers.
pub type CallbackResult = Result<(), CallbackError>;

/// Type alias for a boxed transition callback.
type StateCallback = Box<dyn FnMut(StateValue, StateValue) -> CallbackResult + Send>;

/// A contained subscriber failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackFault {
    /// The callback returned an error.
    Failed(String),
    /// The callback panicked.
    Panicked(String),
}

impl std::fmt::Display for CallbackFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "callback failed: {reason}"),
            Self::Panicked(reason) => write!(f, "callback panicked: {reason}"),
        }
    }
}

/// At most one callback per tracked type.
///
/// Registration takes `&mut self`, so it cannot overlap with a running
/// reconciliation pass over the same table.
#[derive(Default)]
pub struct CallbackTable {
    hdr: Option<StateCallback>,
    power: Option<StateCallback>,
}

impl CallbackTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, state_type: TrackedStateType) -> &mut Option<StateCallback> {
        match state_type {
            TrackedStateType::Hdr => &mut self.hdr,
            TrackedStateType::Power => &mut self.power,
        }
    }

    /// Registers the callback for `state_type`, replacing any previous one.
    ///
    /// Returns `true` if a callback was replaced.
    pub fn set<F>(&mut self, state_type: TrackedStateType, callback: F) -> bool
    where
        F: FnMut(StateValue, StateValue) -> CallbackResult + Send + 'static,
    {
        self.slot(state_type).replace(Box::new(callback)).is_some()
    }

    /// Registers a typed callback for HDR transitions.
    pub fn on_hdr_changed<F>(&mut self, mut callback: F) -> bool
    where
        F: FnMut(HdrMode, HdrMode) -> CallbackResult + Send + 'static,
    {
        self.set(TrackedStateType::Hdr, move |new, old| {
            match (new.as_hdr(), old.as_hdr()) {
                (Some(new), Some(old)) => callback(new, old),
                _ => Ok(()),
            }
        })
    }

    /// Registers a typed callback for power transitions.
    pub fn on_power_changed<F>(&mut self, mut callback: F) -> bool
    where
        F: FnMut(PowerMode, PowerMode) -> CallbackResult + Send + 'static,
    {
        self.set(TrackedStateType::Power, move |new, old| {
            match (new.as_power(), old.as_power()) {
                (Some(new), Some(old)) => callback(new, old),
                _ => Ok(()),
            }
        })
    }

    /// Removes the callback for `state_type`. Returns `true` if one was set.
    pub fn remove(&mut self, state_type: TrackedStateType) -> bool {
        self.slot(state_type).take().is_some()
    }

    /// Returns `true` if `state_type` has a subscriber.
    #[must_use]
    pub fn is_registered(&self, state_type: TrackedStateType) -> bool {
        match state_type {
            TrackedStateType::Hdr => self.hdr.is_some(),
            TrackedStateType::Power => self.power.is_some(),
        }
    }

    /// Returns the number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.hdr.is_some()) + usize::from(self.power.is_some())
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes the subscriber for `state_type`, containing any failure.
    ///
    /// Returns `None` if nobody is subscribed.
    pub(crate) fn invoke(
        &mut self,
        state_type: TrackedStateType,
        new: StateValue,
        old: StateValue,
    ) -> Option<Result<(), CallbackFault>> {
        let callback = self.slot(state_type).as_mut()?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(new, old)));
        Some(match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(CallbackFault::Failed(err.to_string())),
            Err(payload) => Err(CallbackFault::Panicked(panic_message(payload.as_ref()))),
        })
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackTable")
            .field("hdr", &self.hdr.is_some())
            .field("power", &self.power.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
