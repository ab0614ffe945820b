// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Ship a development snapshot of a package to a remote host.
//!
//! Publishing every development version of a helper package to a registry is
//! tedious. A [`PackageDeployment`] uploads the package source into a staging
//! directory on the remote host instead, and installs it from there with the
//! configured installer.

use crate::{
    connection::{ConnectionError, OnFailure, RunOptions, StateConnection, Target, TargetSpec},
    sync::{SyncError, SyncOptions},
};

use std::path::PathBuf;
use tracing::{info, instrument};

/// Default installer program.
pub const DEFAULT_INSTALLER: &str = "pip";

/// Default staging directory on remote host.
pub const DEFAULT_STAGING_DIR: &str = "~/tmp";

/// Default paths excluded from upload.
pub const DEFAULT_EXCLUDES: [&str; 5] = [".git/", ".idea/", "*/__pycache__/*", "__pycache__/", "target/"];

/// Upload and install a package on a remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDeployment {
    package_dir: PathBuf,
    package_name: String,
    installer: String,
    staging_dir: String,
    excludes: Vec<String>,
}

impl PackageDeployment {
    /// Construct new package deployment with default installer, staging
    /// directory, and excludes.
    pub fn new(package_dir: impl Into<PathBuf>, package_name: impl Into<String>) -> Self {
        Self {
            package_dir: package_dir.into(),
            package_name: package_name.into(),
            installer: DEFAULT_INSTALLER.into(),
            staging_dir: DEFAULT_STAGING_DIR.into(),
            excludes: DEFAULT_EXCLUDES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Use another installer program, e.g., `pip3` or a venv's pip.
    pub fn installer(mut self, installer: impl Into<String>) -> Self {
        self.installer = installer.into();
        self
    }

    /// Use another staging directory on the remote host.
    pub fn staging_dir(mut self, staging_dir: impl Into<String>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    /// Exclude additional path pattern from upload.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Rsync filter arguments for excludes.
    pub fn filters(&self) -> Vec<String> {
        self.excludes
            .iter()
            .map(|pattern| format!("--exclude={pattern}"))
            .collect()
    }

    /// Name of package directory, i.e., its last path component.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::MissingDir`] if package directory does not
    ///   exist.
    pub fn dir_name(&self) -> Result<String> {
        self.canonical_dir()?
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| self.missing_dir())
    }

    /// Source path handed to rsync.
    ///
    /// Always absolute and without trailing slash, so rsync creates the
    /// package directory itself inside the staging directory.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::MissingDir`] if package directory does not
    ///   exist.
    pub fn upload_source(&self) -> Result<String> {
        Ok(self.canonical_dir()?.to_string_lossy().into_owned())
    }

    fn canonical_dir(&self) -> Result<PathBuf> {
        let dir = self
            .package_dir
            .canonicalize()
            .map_err(|_| self.missing_dir())?;
        if !dir.is_dir() {
            return Err(self.missing_dir());
        }

        Ok(dir)
    }

    fn missing_dir(&self) -> PackageError {
        PackageError::MissingDir {
            path: self.package_dir.clone(),
        }
    }

    /// Installer commands run after upload, in order.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::MissingDir`] if package directory does not
    ///   exist.
    pub fn install_commands(&self) -> Result<[String; 2]> {
        let staged = format!("{}/{}", self.staging_dir.trim_end_matches('/'), self.dir_name()?);
        Ok([
            format!("{} uninstall -y {}", self.installer, self.package_name),
            format!("{} install {staged}", self.installer),
        ])
    }

    /// Upload package and reinstall it on remote host.
    ///
    /// Failure to uninstall a previous version is suppressed.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::NotRemote`] if connection is not remote.
    /// - Return [`PackageError::MissingDir`] if package directory does not
    ///   exist.
    /// - Return [`PackageError::Sync`] if upload fails.
    /// - Return [`PackageError::Connection`] if installation fails.
    #[instrument(skip(self, connection), level = "debug")]
    pub fn deploy(&self, connection: &mut StateConnection) -> Result<()> {
        if connection.target() != Target::Remote {
            return Err(PackageError::NotRemote {
                target: connection.target(),
            });
        }

        let [uninstall, install] = self.install_commands()?;
        let source = self.upload_source()?;
        info!("deploy package {:?} from {source:?}", self.package_name);

        connection.upload(
            source.as_str(),
            self.staging_dir.as_str(),
            SyncOptions::new(TargetSpec::Remote).filters(self.filters()),
        )?;

        connection.run(
            uninstall,
            RunOptions::new().on_failure(OnFailure::Suppress),
        )?;
        connection.run(install, RunOptions::new())?;

        Ok(())
    }
}

/// All possible error types for package deployment.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Connection does not target a remote host.
    #[error("package deployment needs a remote connection, not {target}")]
    NotRemote { target: Target },

    /// Package directory does not exist.
    #[error("package directory {:?} does not exist", path.display())]
    MissingDir { path: PathBuf },

    /// Installer command fails.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Upload fails.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Friendly result alias :3
pub type Result<T, E = PackageError> = std::result::Result<T, E>;
