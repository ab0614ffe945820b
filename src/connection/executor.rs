// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Execution backends.
//!
//! A connection hands a fully composed shell line to an [`Executor`]. The
//! executor only cares about running that line somewhere and capturing what
//! came back. Local lines are run through bash, remote lines through the ssh
//! client binary in batch mode.

use std::{fmt::Debug, path::PathBuf, process::Command};
use tracing::{debug, instrument};

/// Raw captured output of an executed shell line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawOutput {
    /// Exit code of the shell.
    pub exit_code: i32,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,
}

/// Run composed shell lines somewhere.
pub trait Executor: Debug {
    /// Execute shell line, optionally inside a working directory.
    ///
    /// # Errors
    ///
    /// - Return [`TransportError`] if the line could not be handed to a shell
    ///   at all. A shell that runs the line and exits nonzero is not an error.
    fn execute(&mut self, line: &str, working_dir: Option<&str>) -> Result<RawOutput>;
}

/// Execute shell lines on the local machine.
#[derive(Debug, Clone)]
pub struct LocalShell {
    shell: PathBuf,
}

impl LocalShell {
    /// Construct new local shell executor using bash.
    pub fn new() -> Self {
        Self::with_shell("/bin/bash")
    }

    /// Construct new local shell executor with custom shell binary.
    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for LocalShell {
    #[instrument(skip(self), level = "debug")]
    fn execute(&mut self, line: &str, working_dir: Option<&str>) -> Result<RawOutput> {
        let mut command = Command::new(&self.shell);
        command.arg("-c").arg(line);

        if let Some(dir) = working_dir {
            let dir = crate::path::expand(dir).map_err(|err| TransportError::WorkingDir {
                path: dir.to_owned(),
                detail: err.to_string(),
            })?;

            if !dir.is_dir() {
                return Err(TransportError::WorkingDir {
                    path: dir.display().to_string(),
                    detail: "not a directory".into(),
                });
            }
            command.current_dir(&dir);
        }

        let output = command.output().map_err(|err| TransportError::Spawn {
            program: self.shell.display().to_string(),
            source: err,
        })?;

        Ok(RawOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Execute shell lines on a remote machine through the ssh client.
///
/// Authentication is left to the ssh agent. Batch mode is always enabled so
/// a missing agent fails fast instead of blocking on a password prompt.
#[derive(Debug, Clone)]
pub struct SshSession {
    host: String,
    user: String,
    port: u16,
}

impl SshSession {
    /// Construct new ssh session on default port.
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port: 22,
        }
    }

    /// Use custom port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Remote address as `user@host`.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    pub(crate) fn build_ssh_args(&self, line: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        args.push(self.destination());
        args.push(line.to_string());
        args
    }
}

impl Executor for SshSession {
    /// Remote lines already carry their change of directory, so
    /// `working_dir` is ignored here.
    #[instrument(skip(self, _working_dir), level = "debug")]
    fn execute(&mut self, line: &str, _working_dir: Option<&str>) -> Result<RawOutput> {
        let output = Command::new("ssh")
            .args(self.build_ssh_args(line))
            .output()
            .map_err(|err| TransportError::Spawn {
                program: "ssh".into(),
                source: err,
            })?;

        let raw = RawOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        // INVARIANT: ssh reserves exit code 255 for its own failures.
        if raw.exit_code == 255 && is_auth_failure(&raw.stderr) {
            debug!("ssh authentication failed: {}", raw.stderr.trim());
            return Err(TransportError::Authentication {
                destination: self.destination(),
                detail: raw.stderr.trim().to_string(),
            });
        }

        Ok(raw)
    }
}

fn is_auth_failure(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    ["permission denied", "agent", "passphrase", "authentication"]
        .iter()
        .any(|needle| stderr.contains(needle))
}

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Remote host rejected our credentials, or no credentials were available.
    #[error("could not authenticate as {destination}: {detail}")]
    Authentication { destination: String, detail: String },

    /// Shell or ssh binary could not be spawned.
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Working directory for local execution is unusable.
    #[error("cannot use working directory {path}: {detail}")]
    WorkingDir { path: String, detail: String },
}

/// Friendly result alias :3
pub type Result<T, E = TransportError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn ssh_args_use_batch_mode() {
        let session = SshSession::new("example.org", "deploy");
        assert_eq!(
            session.build_ssh_args("cd ~/app; hostname"),
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "deploy@example.org",
                "cd ~/app; hostname",
            ]
        );

        let session = session.with_port(2222);
        assert!(session
            .build_ssh_args("true")
            .windows(2)
            .any(|pair| pair == ["-p", "2222"]));
    }

    #[test_case("deploy@example.org: Permission denied (publickey).", true; "publickey denied")]
    #[test_case("Could not open a connection to your authentication agent.", true; "no agent")]
    #[test_case("ssh: connect to host example.org port 22: Connection refused", false; "refused")]
    #[test]
    fn auth_failures_are_recognized(stderr: &str, expect: bool) {
        pretty_assertions::assert_eq!(is_auth_failure(stderr), expect);
    }

    #[test]
    fn local_shell_captures_output_and_exit_code() -> anyhow::Result<()> {
        let mut shell = LocalShell::new();
        let output = shell.execute("echo out; echo err >&2; exit 3", None)?;
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        Ok(())
    }

    #[test]
    fn local_shell_runs_inside_working_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut shell = LocalShell::new();
        let output = shell.execute("pwd", Some(dir.path().to_str().unwrap()))?;
        let name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(output.stdout.trim().ends_with(&name));
        Ok(())
    }

    #[test]
    fn local_shell_rejects_missing_working_directory() {
        let mut shell = LocalShell::new();
        let result = shell.execute("pwd", Some("/does/not/exist/at/all"));
        assert!(matches!(result, Err(TransportError::WorkingDir { .. })));
    }
}
