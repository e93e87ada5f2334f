// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mirroring committed state onto an actuator.
//!
//! State callbacks run inside the reconciliation pass and must not wait on
//! the network. They push [`ComponentChange`]s into the [`Mirror`]'s queue
//! instead; a single worker task applies them to the [`Actuator`] one at a
//! time, in the order they were issued. Failures are logged and dropped:
//! the committed state table is never rolled back.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::actuator::{Actuator, Component};
use crate::error::ActuatorError;
use crate::reconciler::{CallbackResult, CallbackTable};
use crate::state::CurrentStateTable;
use crate::types::{HdrMode, PowerMode};

/// A requested component toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentChange {
    /// Target component.
    pub component: Component,
    /// Requested state.
    pub enabled: bool,
}

/// Handle to the mirror worker.
///
/// Cheap to clone. The worker stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct Mirror {
    tx: mpsc::UnboundedSender<ComponentChange>,
}

impl Mirror {
    /// Spawns the worker applying changes to `actuator`.
    #[must_use]
    pub fn spawn<A>(actuator: A) -> (Self, JoinHandle<()>)
    where
        A: Actuator + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(actuator, rx));
        (Self { tx }, worker)
    }

    /// Queues a component change.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::ChannelClosed`] if the worker is gone.
    pub fn push(&self, component: Component, enabled: bool) -> Result<(), ActuatorError> {
        self.tx
            .send(ComponentChange { component, enabled })
            .map_err(|_| ActuatorError::ChannelClosed)
    }

    /// Mirrors an HDR transition: the HDR component follows the new mode.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::ChannelClosed`] if the worker is gone.
    pub fn hdr_changed(&self, new: HdrMode, old: HdrMode) -> Result<(), ActuatorError> {
        tracing::debug!(old = %old, new = %new, "Mirroring HDR change");
        self.push(Component::Hdr, new.is_on())
    }

    /// Mirrors a power transition.
    ///
    /// HDR is switched off on every power change. The LED output and the
    /// grabber then follow whether the device is fully on.
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::ChannelClosed`] if the worker is gone.
    pub fn power_changed(&self, new: PowerMode, old: PowerMode) -> Result<(), ActuatorError> {
        tracing::debug!(old = %old, new = %new, "Mirroring power change");
        let on = new.is_on();
        self.push(Component::Hdr, false)?;
        self.push(Component::LedDevice, on)?;
        self.push(Component::VideoGrabber, on)
    }

    /// Registers the HDR and power callbacks on `callbacks`.
    pub fn install(&self, callbacks: &mut CallbackTable) {
        let hdr = self.clone();
        callbacks.on_hdr_changed(move |new, old| -> CallbackResult {
            hdr.hdr_changed(new, old)?;
            Ok(())
        });

        let power = self.clone();
        callbacks.on_power_changed(move |new, old| -> CallbackResult {
            power.power_changed(new, old)?;
            Ok(())
        });
    }
}

async fn run_worker<A: Actuator>(actuator: A, mut rx: mpsc::UnboundedReceiver<ComponentChange>) {
    while let Some(change) = rx.recv().await {
        match actuator
            .set_component_enabled(change.component, change.enabled)
            .await
        {
            Ok(()) => {
                tracing::debug!(component = %change.component, enabled = change.enabled, "Actuator updated");
            }
            Err(err) => {
                tracing::warn!(
                    component = %change.component,
                    enabled = change.enabled,
                    error = %err,
                    "Could not update actuator"
                );
            }
        }
    }
    tracing::debug!("Mirror worker stopped");
}

/// Reads the actuator's current state to seed the state table.
///
/// HDR follows the `HDR` component; power is `On` when the LED output is
/// enabled and `Sleeping` otherwise. If the actuator cannot be queried the
/// seed is `Off`/`Sleeping`.
pub async fn seed_state<A: Actuator>(actuator: &A) -> CurrentStateTable {
    let seeded = actuator.server_info().await.and_then(|info| {
        Ok(CurrentStateTable::new(
            HdrMode::from(info.is_enabled(Component::Hdr)?),
            if info.is_enabled(Component::LedDevice)? {
                PowerMode::On
            } else {
                PowerMode::Sleeping
            },
        ))
    });

    match seeded {
        Ok(table) => {
            tracing::info!(hdr = %table.hdr(), power = %table.power(), "Seeded state from actuator");
            table
        }
        Err(err) => {
            let table = CurrentStateTable::new(HdrMode::Off, PowerMode::Sleeping);
            tracing::warn!(
                error = %err,
                hdr = %table.hdr(),
                power = %table.power(),
                "Could not read actuator state, using fallback seed"
            );
            table
        }
    }
}
