// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value domains of the tracked device properties.
//!
//! Each tracked property has its own closed enum so that a value can only
//! ever be one of the states the device actually reports.
//!
//! # Types
//!
//! - [`HdrMode`] - Display HDR output (Off/On)
//! - [`PowerMode`] - Device power state (Off/Sleeping/On)

mod hdr;
mod power;

pub use hdr::HdrMode;
pub use power::PowerMode;
