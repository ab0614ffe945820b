// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for files that deployment scripts need
//! to interact with on the local machine.

use std::path::PathBuf;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PathError::NoWayHome)
}

/// Determine default directory to start searching for configuration files.
///
/// Deployment scripts are expected to be launched from their own directory,
/// so the current working directory of the process is used.
///
/// # Errors
///
/// - Return [`PathError::CurrentDir`] if current directory is inaccessible.
pub fn default_start_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(PathError::CurrentDir)
}

/// Expand leading tilde and environment variables of a local path.
///
/// # Errors
///
/// - Return [`PathError::ShellExpansion`] if a referenced variable is not
///   defined.
pub fn expand(path: impl AsRef<str>) -> Result<PathBuf> {
    let home = || {
        home_dir()
            .ok()
            .map(|home| home.to_string_lossy().into_owned())
    };

    shellexpand::full_with_context(path.as_ref(), home, |var| std::env::var(var).map(Some))
        .map(|expanded| PathBuf::from(expanded.into_owned()))
        .map_err(PathError::ShellExpansion)
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine user's home directory.
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Current working directory cannot be accessed.
    #[error("cannot access current working directory")]
    CurrentDir(#[source] std::io::Error),

    /// Environment variable referenced in path is undefined.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
