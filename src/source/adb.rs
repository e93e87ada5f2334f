// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `adb logcat` over the network.

use std::io;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::error::SourceError;

use super::{LogSource, LogStream, StreamProcess};

/// Log source backed by the `adb` command-line tool.
///
/// # Examples
///
/// ```
/// use shield_watcher::source::{AdbLogSource, LogSource};
///
/// let source = AdbLogSource::new("192.168.1.20", 5555);
/// assert_eq!(source.target(), "192.168.1.20:5555");
/// assert_eq!(source.program(), "adb");
/// ```
#[derive(Debug, Clone)]
pub struct AdbLogSource {
    program: String,
    serial: String,
}

impl AdbLogSource {
    /// Default `adb` program name, resolved through `PATH`.
    pub const DEFAULT_PROGRAM: &'static str = "adb";

    /// Default adb-over-TCP port.
    pub const DEFAULT_PORT: u16 = 5555;

    /// Creates a source for the device at `host:port`.
    #[must_use]
    pub fn new(host: impl AsRef<str>, port: u16) -> Self {
        Self {
            program: Self::DEFAULT_PROGRAM.to_string(),
            serial: format!("{}:{port}", host.as_ref()),
        }
    }

    /// Uses a specific `adb` executable instead of the one on `PATH`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Returns the `adb` program that will be run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    fn spawn_error(&self, err: io::Error) -> SourceError {
        if err.kind() == io::ErrorKind::NotFound {
            SourceError::ToolNotFound(self.program.clone())
        } else {
            SourceError::Io(err)
        }
    }
}

impl LogSource for AdbLogSource {
    fn target(&self) -> &str {
        &self.serial
    }

    async fn locate(&self) -> Result<(), SourceError> {
        let output = self
            .command(["version"])
            .output()
            .await
            .map_err(|err| self.spawn_error(err))?;

        if output.status.success() {
            tracing::debug!(
                program = %self.program,
                version = %String::from_utf8_lossy(&output.stdout).lines().next().unwrap_or_default(),
                "Located log tool"
            );
            Ok(())
        } else {
            Err(SourceError::ToolNotFound(self.program.clone()))
        }
    }

    async fn connect(&self) -> Result<(), SourceError> {
        let args = ["connect", self.serial.as_str()];
        tracing::debug!(target_device = %self.serial, "Connecting to device");

        let output = self
            .command(args)
            .output()
            .await
            .map_err(|err| self.spawn_error(err))?;

        // adb reports refusals on stdout with a zero exit status.
        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() && stdout.contains("connected to") {
            tracing::info!(target_device = %self.serial, "Connected to device");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = [stdout.trim(), stderr.trim()]
            .into_iter()
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        Err(SourceError::CommandFailed {
            command: self.command_line(&args),
            detail: if detail.is_empty() {
                output.status.to_string()
            } else {
                detail
            },
        })
    }

    async fn flush_backlog(&self) -> Result<(), SourceError> {
        let args = ["-s", self.serial.as_str(), "logcat", "-c"];
        let status = self
            .command(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|err| self.spawn_error(err))?;

        if status.success() {
            tracing::debug!(target_device = %self.serial, "Cleared log backlog");
            Ok(())
        } else {
            Err(SourceError::CommandFailed {
                command: self.command_line(&args),
                detail: status.to_string(),
            })
        }
    }

    fn spawn_stream(&self) -> Result<LogStream, SourceError> {
        let mut child = self
            .command(["-s", self.serial.as_str(), "logcat"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| self.spawn_error(err))?;

        let stdout = child.stdout.take().ok_or(SourceError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(SourceError::MissingPipe("stderr"))?;

        tracing::debug!(target_device = %self.serial, pid = ?child.id(), "Started logcat");

        Ok(LogStream {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            process: Box::new(child),
        })
    }
}

impl StreamProcess for Child {
    fn has_exited(&mut self) -> bool {
        // An error means the process can no longer be observed; treat it as gone.
        !matches!(self.try_wait(), Ok(None))
    }

    fn terminate(&mut self) {
        if let Err(err) = self.start_kill() {
            tracing::debug!(error = %err, "Could not kill log process");
        }
    }
}
