// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tracked state types, values, updates and the committed state table.
//!
//! A [`StateUpdate`] is what the extractor proposes after reading one log
//! line. The [`CurrentStateTable`] is what the reconciler has committed.
//! The two are never the same thing: an update sitting in the channel is
//! not yet state.
//!
//! # Examples
//!
//! ```
//! use shield_watcher::state::{CurrentStateTable, StateUpdate, StateValue, TrackedStateType};
//! use shield_watcher::types::{HdrMode, PowerMode};
//!
//! let mut table = CurrentStateTable::new(HdrMode::Off, PowerMode::Sleeping);
//!
//! let update = StateUpdate::new("hwcomposer", HdrMode::On);
//! assert_eq!(update.state_type(), TrackedStateType::Hdr);
//!
//! assert!(table.apply(&update));
//! assert_eq!(table.get(TrackedStateType::Hdr), StateValue::Hdr(HdrMode::On));
//! ```

mod table;
mod tracked;
mod update;

pub use table::CurrentStateTable;
pub use tracked::{StateValue, TrackedStateType};
pub use update::StateUpdate;
