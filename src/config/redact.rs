// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Produce shareable copies of configuration files.
//!
//! Keys whose name mentions a password or a key get their value replaced by a
//! random token. Commented out secrets are dropped entirely. Everything else
//! is copied line by line, so layout and comments survive.
//!
//! The file must parse as a configuration file first, so secrets are only
//! looked for in documents the settings loader accepts.

use crate::config::parse_ini;

use std::{
    collections::HashSet,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument};
use uuid::Uuid;

const SECRET_MARKERS: [&str; 2] = ["pass", "key"];

/// Write redacted sibling of configuration file.
///
/// The sibling replaces `production` in the file name with `example`, or
/// appends `-example` to the file stem if there is no such word.
///
/// # Errors
///
/// - Return [`RedactError::InvalidPath`] if path has no file name.
/// - Return [`RedactError::Read`] or [`RedactError::Write`] on I/O failure.
/// - Return [`RedactError::Parse`] if file is not valid INI.
#[instrument(skip(path), level = "debug")]
pub fn redact_secrets(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let target = example_path(path)?;

    let data = read_to_string(path).map_err(|err| RedactError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;

    let mut redacted = redact_document(&data).map_err(|err| RedactError::Parse {
        source: err,
        path: path.to_path_buf(),
    })?;
    if data.ends_with('\n') {
        redacted.push('\n');
    }

    write(&target, redacted).map_err(|err| RedactError::Write {
        source: err,
        path: target.clone(),
    })?;

    info!("redacted {:?} into {:?}", path.display(), target.display());
    Ok(target)
}

/// Redact secrets of INI text.
///
/// # Errors
///
/// - Return [`ini::ParseError`] if text is not valid INI.
pub fn redact_document(data: &str) -> std::result::Result<String, ini::ParseError> {
    let document = parse_ini(data)?;
    let secrets: HashSet<&str> = document
        .iter()
        .flat_map(|(_, properties)| properties.iter())
        .map(|(key, _)| key)
        .filter(|key| is_secret(key))
        .collect();

    Ok(data
        .lines()
        .filter_map(|line| redact_line(line, &secrets))
        .collect::<Vec<_>>()
        .join("\n"))
}

fn redact_line(line: &str, secrets: &HashSet<&str>) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.starts_with(['#', ';']) {
        let body = trimmed.trim_start_matches(['#', ';']);
        return match entry_key(body) {
            Some(key) if is_secret(key) => None,
            _ => Some(line.to_string()),
        };
    }

    // INVARIANT: Indented lines continue a value and never start an entry.
    if line.starts_with([' ', '\t']) {
        return Some(line.to_string());
    }

    match entry_key(trimmed) {
        Some(key) if secrets.contains(key) => {
            let token = Uuid::new_v4().simple().to_string();
            Some(format!("{key} = {token}"))
        }
        _ => Some(line.to_string()),
    }
}

/// Key of `key = value` or `key: value` line.
fn entry_key(line: &str) -> Option<&str> {
    let delimiter = line.find(['=', ':'])?;
    Some(line[..delimiter].trim()).filter(|key| !key.is_empty())
}

fn is_secret(key: &str) -> bool {
    let key = key.to_lowercase();
    SECRET_MARKERS.iter().any(|marker| key.contains(marker))
}

fn example_path(path: &Path) -> Result<PathBuf> {
    let invalid = || RedactError::InvalidPath {
        path: path.to_path_buf(),
    };

    let name = path.file_name().ok_or_else(invalid)?.to_string_lossy();
    let name = if name.contains("production") {
        name.replace("production", "example")
    } else {
        let stem = path.file_stem().ok_or_else(invalid)?.to_string_lossy();
        match path.extension() {
            Some(ext) => format!("{stem}-example.{}", ext.to_string_lossy()),
            None => format!("{stem}-example"),
        }
    };

    Ok(path.with_file_name(name))
}

/// All possible error types for secret redaction.
#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    /// Path does not name a file.
    #[error("{:?} does not name a file", path.display())]
    InvalidPath { path: PathBuf },

    /// Source cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Source is not valid INI.
    #[error("failed to parse {:?}", path.display())]
    Parse {
        #[source]
        source: ini::ParseError,
        path: PathBuf,
    },

    /// Redacted copy cannot be written.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RedactError> = std::result::Result<T, E>;
