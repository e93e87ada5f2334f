// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The foreground watch loop.
//!
//! A [`Watcher`] ties a [`Supervisor`] and a [`Reconciler`] together over
//! one update channel. Every tick it checks the log stream's liveness
//! (restarting it if needed) and then reconciles everything the stdout
//! tail has enqueued since the previous tick.
//!
//! # Examples
//!
//! ```no_run
//! use shield_watcher::source::AdbLogSource;
//! use shield_watcher::state::CurrentStateTable;
//! use shield_watcher::watcher::Watcher;
//!
//! # async fn example() -> Result<(), shield_watcher::error::SupervisorError> {
//! let mut watcher = Watcher::builder(AdbLogSource::new("192.168.1.20", 5555))
//!     .with_initial_state(CurrentStateTable::default())
//!     .build();
//!
//! watcher.callbacks_mut().on_hdr_changed(|new, old| {
//!     println!("HDR {old} -> {new}");
//!     Ok(())
//! });
//!
//! watcher.run().await
//! # }
//! ```

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::channel::update_channel;
use crate::error::SupervisorError;
use crate::extract::Extractor;
use crate::reconciler::{CallbackTable, ReconcileReport, Reconciler};
use crate::source::LogSource;
use crate::state::CurrentStateTable;
use crate::supervisor::{Supervisor, SupervisorConfig, SupervisorState};

/// Builder for a [`Watcher`].
#[derive(Debug)]
pub struct WatcherBuilder<S> {
    source: S,
    initial: CurrentStateTable,
    extractor: Option<Extractor>,
    supervisor: SupervisorConfig,
    tick: Duration,
}

impl<S: LogSource> WatcherBuilder<S> {
    /// Sets the seed of the state table.
    #[must_use]
    pub fn with_initial_state(mut self, initial: CurrentStateTable) -> Self {
        self.initial = initial;
        self
    }

    /// Uses a custom extractor instead of the built-in rules.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Sets the supervisor configuration.
    #[must_use]
    pub fn with_supervisor_config(mut self, config: SupervisorConfig) -> Self {
        self.supervisor = config;
        self
    }

    /// Sets the tick period.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Wires the supervisor and reconciler over a fresh update channel.
    #[must_use]
    pub fn build(self) -> Watcher<S> {
        let (tx, rx) = update_channel();
        let extractor = self.extractor.unwrap_or_else(Extractor::builtin);
        Watcher {
            supervisor: Supervisor::new(self.source, extractor, tx, self.supervisor),
            reconciler: Reconciler::new(self.initial, rx),
            tick: self.tick,
        }
    }
}

/// Supervisor plus reconciler, driven on a fixed cadence.
#[derive(Debug)]
pub struct Watcher<S> {
    supervisor: Supervisor<S>,
    reconciler: Reconciler,
    tick: Duration,
}

impl<S: LogSource> Watcher<S> {
    /// Default tick period.
    pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

    /// Starts building a watcher over `source`.
    #[must_use]
    pub fn builder(source: S) -> WatcherBuilder<S> {
        WatcherBuilder {
            source,
            initial: CurrentStateTable::default(),
            extractor: None,
            supervisor: SupervisorConfig::default(),
            tick: Self::DEFAULT_TICK,
        }
    }

    /// Returns the callback table.
    pub fn callbacks_mut(&mut self) -> &mut CallbackTable {
        self.reconciler.callbacks_mut()
    }

    /// Returns the committed state.
    #[must_use]
    pub const fn state(&self) -> &CurrentStateTable {
        self.reconciler.state()
    }

    /// Returns the supervisor.
    #[must_use]
    pub const fn supervisor(&self) -> &Supervisor<S> {
        &self.supervisor
    }

    /// Returns the tick period.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        self.tick
    }

    /// Locates the log tool and establishes the first session.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError` on fatal supervisor outcomes.
    pub async fn start(&mut self) -> Result<SupervisorState, SupervisorError> {
        self.supervisor.start().await
    }

    /// Runs one liveness check followed by one reconciliation pass.
    ///
    /// The liveness check never sleeps, so a device that stays unreachable
    /// does not hold up reconciliation.
    pub async fn tick(&mut self) -> ReconcileReport {
        self.supervisor.step().await;
        let report = self.reconciler.reconcile();
        if !report.is_idle() {
            tracing::trace!(
                applied = report.applied,
                transitions = report.transitions.len(),
                faults = report.faults,
                "Reconciled"
            );
        }
        report
    }

    /// Starts the supervisor and ticks forever.
    ///
    /// Only the first session can fail fatally. Never returns `Ok`; stop it
    /// by dropping the future, e.g. from a `tokio::select!` against a
    /// shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError` if the first session cannot be started.
    pub async fn run(&mut self) -> Result<(), SupervisorError> {
        self.start().await?;

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
