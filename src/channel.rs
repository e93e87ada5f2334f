// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Update channel between the tail tasks and the reconciler.
//!
//! An unbounded, ordered tokio channel. Producers (stdout tail tasks,
//! possibly from successive log sessions) clone the [`UpdateSender`]; the
//! single [`UpdateReceiver`] is drained without waiting on every tick.
//!
//! # Examples
//!
//! ```
//! use shield_watcher::channel::update_channel;
//! use shield_watcher::state::StateUpdate;
//! use shield_watcher::types::HdrMode;
//!
//! let (tx, mut rx) = update_channel();
//! tx.send(StateUpdate::new("hwcomposer", HdrMode::On)).unwrap();
//! tx.send(StateUpdate::new("hwcomposer", HdrMode::Off)).unwrap();
//!
//! let drained = rx.drain();
//! assert_eq!(drained.len(), 2);
//! assert!(rx.drain().is_empty());
//! ```

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::state::StateUpdate;

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn update_channel() -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UpdateSender { tx }, UpdateReceiver { rx })
}

/// Producer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: mpsc::UnboundedSender<StateUpdate>,
}

impl UpdateSender {
    /// Enqueues an update without blocking.
    ///
    /// # Errors
    ///
    /// Returns the update back if the receiver has been dropped.
    pub fn send(&self, update: StateUpdate) -> Result<(), StateUpdate> {
        self.tx.send(update).map_err(|err| err.0)
    }

    /// Returns `true` if the receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the reconciler.
#[derive(Debug)]
pub struct UpdateReceiver {
    rx: mpsc::UnboundedReceiver<StateUpdate>,
}

impl UpdateReceiver {
    /// Receives every update currently buffered, in arrival order.
    ///
    /// Never waits: returns an empty vector if nothing is pending, and also
    /// once every sender is gone.
    pub fn drain(&mut self) -> Vec<StateUpdate> {
        let mut updates = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(update) => updates.push(update),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        updates
    }
}
