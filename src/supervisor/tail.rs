// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background readers for a log stream's pipes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channel::UpdateSender;
use crate::extract::Extractor;
use crate::source::LogPipe;

/// Reads stdout line by line, extracting and enqueueing updates inline.
///
/// Returns the number of lines read once the pipe closes.
pub(super) async fn tail_stdout(pipe: LogPipe, extractor: Extractor, sender: UpdateSender) -> u64 {
    let mut reader = BufReader::new(pipe);
    let mut line = Vec::with_capacity(256);
    let mut lines = 0;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                lines += 1;
                extractor.process_line(&line, &sender);
                if sender.is_closed() {
                    tracing::debug!("Update channel closed, stopping stdout tail");
                    break;
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "Log stdout read failed");
                break;
            }
        }
    }

    tracing::debug!(lines, "Log stdout closed");
    lines
}

/// Reads stderr until a fatal marker shows up, then raises `fatal`.
pub(super) async fn watch_stderr(pipe: LogPipe, markers: Arc<[String]>, fatal: Arc<AtomicBool>) {
    let mut reader = BufReader::new(pipe);
    let mut line = Vec::with_capacity(128);

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end();
                if let Some(marker) = markers.iter().find(|marker| text.contains(marker.as_str())) {
                    tracing::warn!(marker = %marker, "Log tool reported a fatal condition");
                    fatal.store(true, Ordering::Release);
                    break;
                }
                tracing::debug!(stderr = %text, "Log tool diagnostic");
            }
            Err(err) => {
                tracing::debug!(error = %err, "Log stderr read failed");
                break;
            }
        }
    }
}
