// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for `logcat` lines in the default `threadtime` format.
//!
//! ```text
//! 07-19 10:22:05.123  1234  5678 I hwcomposer: HDR: Flip new SMPTE 2086 metadata
//! ^^^^^ ^^^^^^^^^^^^  ^^^^  ^^^^ ^ ^^^^^^^^^^   ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//! date  time          pid   tid  severity/tag   message body
//! ```
//!
//! The stream interleaves output from every process on the device, so a
//! line that does not fit this shape is simply not ours: [`parse_line`]
//! returns `None` rather than an error.

use std::sync::OnceLock;

use chrono::NaiveTime;
use regex::Regex;

/// Pattern for one `threadtime` line. PID, TID and severity are matched but
/// not captured.
const LINE_PATTERN: &str = concat!(
    r"^(?P<month>\d{2})-(?P<day>\d{2})\s+",
    r"(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})\.(?P<millis>\d{3})\s+",
    r"\d+\s+\d+\s+\w\s+(?P<source>\S+)\s*:\s+(?P<message>.+)$",
);

fn line_regex() -> &'static Regex {
    static LINE_REGEX: OnceLock<Regex> = OnceLock::new();
    LINE_REGEX.get_or_init(|| Regex::new(LINE_PATTERN).expect("line pattern should compile"))
}

/// Wall-clock prefix of a log line.
///
/// `logcat` omits the year, so only month, day and time of day are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogTimestamp {
    /// Month of year (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Time of day with millisecond precision.
    pub time: NaiveTime,
}

/// One parsed log line, borrowing from the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord<'a> {
    /// When the line was logged.
    pub timestamp: LogTimestamp,
    /// The logging tag (e.g. `hwcomposer`).
    pub source: &'a str,
    /// Everything after the tag separator.
    pub message: &'a str,
}

/// Parses one raw line.
///
/// Accepts undecoded bytes straight from the stream. Returns `None` for
/// non-UTF-8 input, blank lines, and anything not in `threadtime` shape.
/// A trailing line terminator is ignored.
///
/// # Examples
///
/// ```
/// use shield_watcher::parser::parse_line;
///
/// let record = parse_line(b"07-19 10:22:05.123 1234 5678 I hwcomposer: Flip new SMPTE 2086 metadata\n")
///     .unwrap();
/// assert_eq!(record.source, "hwcomposer");
/// assert_eq!(record.message, "Flip new SMPTE 2086 metadata");
///
/// assert!(parse_line(b"--------- beginning of main").is_none());
/// ```
#[must_use]
pub fn parse_line(raw: &[u8]) -> Option<LogRecord<'_>> {
    let text = std::str::from_utf8(raw).ok()?;
    parse_str(text)
}

/// Parses one line of already-decoded text. See [`parse_line`].
#[must_use]
pub fn parse_str(line: &str) -> Option<LogRecord<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let caps = line_regex().captures(line)?;

    let field = |name: &str| caps.name(name).map(|m| m.as_str());
    let number = |name: &str| field(name).and_then(|s| s.parse::<u32>().ok());

    let time = NaiveTime::from_hms_milli_opt(
        number("hour")?,
        number("minute")?,
        number("second")?,
        number("millis")?,
    )?;
    let timestamp = LogTimestamp {
        month: u8::try_from(number("month")?).ok()?,
        day: u8::try_from(number("day")?).ok()?,
        time,
    };

    Some(LogRecord {
        timestamp,
        source: caps.name("source")?.as_str(),
        message: caps.name("message")?.as_str(),
    })
}
