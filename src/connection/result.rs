// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Uniform outcome of dispatched commands.

/// Outcome of one dispatched command.
///
/// # Invariant
///
/// - An omitted command always has an exit code of zero and no output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code of command.
    pub exit_code: i32,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,

    /// Command was skipped because of target spec gating.
    pub was_omitted: bool,

    /// Additional detail attached to synthetic results, e.g., the transport
    /// failure that prevented execution.
    pub extra: Option<String>,
}

impl CommandResult {
    /// Construct result of executed command.
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    /// Construct successful result of a command that was never executed.
    pub fn omitted() -> Self {
        Self {
            was_omitted: true,
            ..Default::default()
        }
    }

    /// Construct synthetic failure.
    pub fn failed(exit_code: i32, detail: impl Into<String>) -> Self {
        Self {
            exit_code: if exit_code == 0 { 1 } else { exit_code },
            extra: Some(detail.into()),
            ..Default::default()
        }
    }

    /// Command exited with zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
