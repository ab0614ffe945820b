// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File synchronization through rsync.
//!
//! Uploads and downloads are gated by target spec exactly like dispatched
//! commands. The remote side of a transfer is only qualified with
//! `user@host:` when the connection itself targets a remote host, so the same
//! deployment script can rehearse a transfer locally.
//!
//! rsync output is not captured. It streams straight to the console.

use crate::{
    connection::{omitted_notice, result::CommandResult, StateConnection, Target, TargetSpec},
    style::dim,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    process::Command,
};
use tracing::{info, instrument};

/// Archive-like flag set used for every transfer.
pub const RSYNC_FLAGS: &str = "-pthrvz";

/// Direction of a transfer relative to the local machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Local source, connection side destination.
    Upload,

    /// Connection side source, local destination.
    Download,
}

/// Options for a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Routing filter.
    pub target_spec: TargetSpec,

    /// Extra rsync arguments, e.g., `--exclude=.git/`.
    pub filters: Vec<String>,

    /// Delete extraneous files from destination.
    pub delete: bool,

    /// Do not fail on nonzero exit code.
    pub tolerate_nonzero_exit: bool,

    /// Only echo the rsync invocation.
    pub print_only: bool,
}

impl SyncOptions {
    /// Construct new transfer options for target spec.
    pub fn new(target_spec: TargetSpec) -> Self {
        Self {
            target_spec,
            filters: Vec::new(),
            delete: false,
            tolerate_nonzero_exit: false,
            print_only: false,
        }
    }

    /// Add extra rsync arguments.
    pub fn filters(mut self, filters: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.filters.extend(filters.into_iter().map(Into::into));
        self
    }

    /// Delete extraneous files from destination.
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Do not fail on nonzero exit code.
    pub fn tolerate_nonzero_exit(mut self) -> Self {
        self.tolerate_nonzero_exit = true;
        self
    }

    /// Only echo the rsync invocation.
    pub fn print_only(mut self) -> Self {
        self.print_only = true;
        self
    }
}

/// Fully resolved rsync invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsyncInvocation {
    args: Vec<String>,
}

impl RsyncInvocation {
    /// Build invocation for connection.
    pub fn new(
        connection: &StateConnection,
        direction: SyncDirection,
        source: impl AsRef<str>,
        dest: impl AsRef<str>,
        options: &SyncOptions,
    ) -> Self {
        let qualify = |path: &str| match (connection.target(), connection.remote_destination()) {
            (Target::Remote, Some(destination)) => format!("{destination}:{path}"),
            _ => local_path(path),
        };

        let (source, dest) = match direction {
            SyncDirection::Upload => (local_path(source.as_ref()), qualify(dest.as_ref())),
            SyncDirection::Download => (qualify(source.as_ref()), local_path(dest.as_ref())),
        };

        let mut args = vec![RSYNC_FLAGS.to_string()];
        if options.delete {
            args.push("--delete".into());
        }

        if connection.target() == Target::Remote {
            args.push("--rsh=ssh -p 22".into());
        }

        args.extend(options.filters.iter().cloned());
        args.push(source);
        args.push(dest);

        Self { args }
    }

    /// Arguments handed to the rsync binary.
    pub fn args(&self) -> &[String] {
        self.args.as_slice()
    }

    fn execute(&self) -> Result<i32> {
        let status = Command::new("rsync")
            .args(&self.args)
            .status()
            .map_err(SyncError::Spawn)?;

        Ok(status.code().unwrap_or(-1))
    }
}

// INVARIANT: rsync is spawned without a shell, so expand the tilde ourselves.
fn local_path(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

impl Display for RsyncInvocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mut line = vec!["rsync".to_string()];
        line.extend(self.args.iter().cloned());
        fmt.write_str(shell_words::join(line).as_str())
    }
}

impl StateConnection {
    /// Upload local source to destination on the connection side.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError`] if transfer fails.
    pub fn upload(
        &self,
        source: impl AsRef<str>,
        dest: impl AsRef<str>,
        options: SyncOptions,
    ) -> Result<CommandResult> {
        self.sync(SyncDirection::Upload, source, dest, options)
    }

    /// Download source on the connection side to local destination.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError`] if transfer fails.
    pub fn download(
        &self,
        source: impl AsRef<str>,
        dest: impl AsRef<str>,
        options: SyncOptions,
    ) -> Result<CommandResult> {
        self.sync(SyncDirection::Download, source, dest, options)
    }

    /// Transfer files with rsync.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::Spawn`] if rsync cannot be spawned.
    /// - Return [`SyncError::Failed`] if rsync exits nonzero, unless nonzero
    ///   exit codes are tolerated.
    #[instrument(skip(self, source, dest), level = "debug")]
    pub fn sync(
        &self,
        direction: SyncDirection,
        source: impl AsRef<str>,
        dest: impl AsRef<str>,
        options: SyncOptions,
    ) -> Result<CommandResult> {
        let invocation = RsyncInvocation::new(self, direction, source, dest, &options);

        if options.print_only {
            println!("{} {invocation}", dim("->"));
            return Ok(CommandResult::default());
        }

        if !options.target_spec.includes(self.target()) {
            let action = format!("rsync command `{invocation}`");
            println!("{}", omitted_notice(&action, options.target_spec));
            return Ok(CommandResult::omitted());
        }

        info!("{invocation}");
        let exit_code = invocation.execute()?;
        if exit_code != 0 && !options.tolerate_nonzero_exit {
            return Err(SyncError::Failed { exit_code });
        }

        Ok(CommandResult::new(exit_code, "", ""))
    }
}

/// All possible error types for file synchronization.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// rsync binary cannot be spawned.
    #[error("failed to spawn rsync")]
    Spawn(#[source] std::io::Error),

    /// rsync exited nonzero.
    #[error("rsync failed with code {exit_code}, see error message above")]
    Failed { exit_code: i32 },
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::executor::LocalShell;
    use pretty_assertions::assert_eq;

    fn remote() -> StateConnection {
        StateConnection::with_executor(
            Target::Remote,
            Some("example.org".into()),
            Some("deploy".into()),
            LocalShell::new(),
        )
    }

    #[test]
    fn upload_qualifies_remote_destination() {
        let connection = remote();
        let options = SyncOptions::new(TargetSpec::Remote).filters(["--exclude=.git/"]);
        let invocation =
            RsyncInvocation::new(&connection, SyncDirection::Upload, "./app", "~/tmp", &options);

        assert_eq!(
            invocation.args(),
            ["-pthrvz", "--rsh=ssh -p 22", "--exclude=.git/", "./app", "deploy@example.org:~/tmp"]
        );
    }

    #[test]
    fn download_qualifies_remote_source() {
        let connection = remote();
        let options = SyncOptions::new(TargetSpec::Both).delete();
        let invocation = RsyncInvocation::new(
            &connection,
            SyncDirection::Download,
            "~/app/db.sqlite3",
            "./backup",
            &options,
        );

        assert_eq!(
            invocation.args(),
            ["-pthrvz", "--delete", "--rsh=ssh -p 22", "deploy@example.org:~/app/db.sqlite3", "./backup"]
        );
    }

    #[test]
    fn local_paths_stay_unqualified() {
        let connection = StateConnection::local();
        let options = SyncOptions::new(TargetSpec::Local);
        let invocation =
            RsyncInvocation::new(&connection, SyncDirection::Upload, "src/", "/tmp/dest", &options);
        assert_eq!(invocation.args(), ["-pthrvz", "src/", "/tmp/dest"]);
    }

    #[test]
    fn excluded_target_spec_omits_transfer() -> anyhow::Result<()> {
        let connection = StateConnection::local();
        let result = connection.upload(
            "/does/not/exist",
            "/does/not/exist/either",
            SyncOptions::new(TargetSpec::Remote),
        )?;
        assert_eq!(result, CommandResult::omitted());
        Ok(())
    }
}
