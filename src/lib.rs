// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `shield_watcher` - mirror an Android TV's HDR and power state onto HyperHDR.
//!
//! The crate watches a device's live `logcat` stream over `adb`, extracts
//! display-HDR and power state from known log lines, and notifies
//! subscribers exactly once per committed transition. The bundled
//! `shield-watcher` binary wires those notifications to a HyperHDR server
//! so the ambient lighting follows what the TV is actually doing.
//!
//! # Pipeline
//!
//! ```text
//! Supervisor --bytes--> parser --record--> Extractor --update--> channel
//!     ^                                      (PatternRegistry)       |
//!     | liveness                                                     v
//!  Watcher tick ------------------------------------------------> Reconciler
//!                                                                    |
//!                                                 callback (new, old)
//!                                                                    v
//!                                                         Mirror -> Actuator
//! ```
//!
//! - [`registry`]: which log sources are tracked and how their messages map
//!   to state values
//! - [`parser`]: splits a raw logcat line into timestamp, source and message
//! - [`extract`]: turns parsed records into [`state::StateUpdate`]s
//! - [`supervisor`] and [`source`]: keep the `adb logcat` stream alive
//! - [`reconciler`]: drains updates, commits state, fires callbacks
//! - [`watcher`]: the foreground loop
//! - [`actuator`] and [`mirror`]: the HyperHDR side
//!
//! # Quick Start
//!
//! ```no_run
//! use shield_watcher::actuator::HyperHdrConfig;
//! use shield_watcher::mirror::{Mirror, seed_state};
//! use shield_watcher::source::AdbLogSource;
//! use shield_watcher::watcher::Watcher;
//!
//! #[tokio::main]
//! async fn main() -> shield_watcher::Result<()> {
//!     let hyperhdr = HyperHdrConfig::new("192.168.1.30").into_client()?;
//!     let seed = seed_state(&hyperhdr).await;
//!     let (mirror, _worker) = Mirror::spawn(hyperhdr);
//!
//!     let mut watcher = Watcher::builder(AdbLogSource::new("192.168.1.20", 5555))
//!         .with_initial_state(seed)
//!         .build();
//!     mirror.install(watcher.callbacks_mut());
//!
//!     watcher.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Custom Subscribers
//!
//! ```
//! use shield_watcher::channel::update_channel;
//! use shield_watcher::extract::Extractor;
//! use shield_watcher::reconciler::Reconciler;
//! use shield_watcher::state::CurrentStateTable;
//! use shield_watcher::types::HdrMode;
//!
//! let (tx, rx) = update_channel();
//! let mut reconciler = Reconciler::new(CurrentStateTable::default(), rx);
//! reconciler.callbacks_mut().on_hdr_changed(|new, old| {
//!     println!("HDR {old} -> {new}");
//!     Ok(())
//! });
//!
//! let line = b"07-19 10:22:05.123 1234 5678 I hwcomposer: Flip new SMPTE 2086 metadata";
//! Extractor::builtin().process_line(line, &tx);
//!
//! reconciler.reconcile();
//! assert_eq!(reconciler.state().hdr(), HdrMode::On);
//! ```

pub mod actuator;
pub mod channel;
pub mod config;
pub mod error;
pub mod extract;
pub mod mirror;
pub mod parser;
pub mod reconciler;
pub mod registry;
pub mod source;
pub mod state;
pub mod supervisor;
pub mod types;
pub mod watcher;

pub use config::WatcherConfig;
pub use error::{
    ActuatorError, ConfigError, Error, Result, RuleError, SourceError, SupervisorError,
};
pub use extract::Extractor;
pub use reconciler::{CallbackTable, ReconcileReport, Reconciler};
pub use registry::PatternRegistry;
pub use state::{CurrentStateTable, StateUpdate, StateValue, TrackedStateType};
pub use supervisor::{ConnectPolicy, Supervisor, SupervisorConfig, SupervisorState};
pub use types::{HdrMode, PowerMode};
pub use watcher::Watcher;
