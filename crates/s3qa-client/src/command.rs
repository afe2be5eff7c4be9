// Copyright 2024 The s3qa Authors
// SPDX-License-Identifier: Apache-2.0

//! Running CLI clients as local processes.

use s3qa_core::{Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Placeholder filled by [`format_command`].
const PLACEHOLDER: &str = "{}";

/// Result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    /// Exit code, absent when terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout on success; on failure stderr, or stdout when stderr is empty.
    #[must_use]
    pub fn text(&self) -> &str {
        if self.success || self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Returns true if stdout or stderr contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.stdout.contains(needle) || self.stderr.contains(needle)
    }
}

/// Run `command` through `sh -c` and wait for it to finish.
///
/// A non-zero exit is reported through [`CommandOutput::success`], not as an
/// error.
///
/// # Errors
///
/// Returns [`Error::Command`] if the shell cannot be spawned.
pub async fn run_local_cmd(command: &str) -> Result<CommandOutput> {
    info!(command, "Running local command");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::Command(format!("failed to spawn '{command}': {e}")))?;

    let result = CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(success = result.success, code = ?result.code, output = %result.text().trim(), "Command finished");
    Ok(result)
}

/// Fill each `{}` in `template` with the next element of `args`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the number of placeholders and
/// arguments differ.
pub fn format_command<S: AsRef<str>>(template: &str, args: &[S]) -> Result<String> {
    let placeholders = template.matches(PLACEHOLDER).count();
    if placeholders != args.len() {
        return Err(Error::InvalidArgument(format!(
            "command template '{template}' has {placeholders} placeholders but {} arguments were given",
            args.len()
        )));
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    for arg in args {
        if let Some((head, tail)) = rest.split_once(PLACEHOLDER) {
            out.push_str(head);
            out.push_str(arg.as_ref());
            rest = tail;
        }
    }
    out.push_str(rest);
    Ok(out)
}
