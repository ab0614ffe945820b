// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration lookup.
//!
//! Deployment scripts keep their settings, and often their secrets, in an INI
//! file that lives somewhere above the script itself. [`find_config`] walks up
//! the directory tree to locate that file, and loads its `[settings]` section
//! into a [`ConfigDocument`].
//!
//! # Development Overrides
//!
//! Any key ending in [`DEVMODE_MARKER`] is a __development override__ for the
//! key without that suffix. When loaded in development mode, the override
//! value replaces the base value:
//!
//! ```ini
//! [settings]
//! DEBUG = False
//! DEBUG__DEVMODE = True
//! ```
//!
//! Overrides without a base key are left alone. The file on disk is never
//! touched.
//!
//! # Dialect
//!
//! Files are read with [`ini`] (`rust-ini`). Keys keep their case, quotes and
//! backslashes are taken literally, and indented lines continue the previous
//! value. Entries of a `[DEFAULT]` section are inherited by `[settings]`
//! unless it defines them itself. Duplicate keys are rejected.

pub mod redact;

use crate::path::default_start_dir;

use ini::{Ini, ParseOption};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info, instrument};

/// Only section of a configuration file that is loaded.
pub const SETTINGS_SECTION: &str = "settings";

/// Section whose entries the settings section inherits.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Suffix marking development overrides.
pub const DEVMODE_MARKER: &str = "__DEVMODE";

/// Extension every configuration file must carry.
pub const CONFIG_EXTENSION: &str = ".ini";

/// Default amount of parent directories to search.
pub const DEFAULT_SEARCH_LIMIT: usize = 4;

/// Options for [`find_config`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FindOptions {
    /// Amount of parent directories to search, defaults to
    /// [`DEFAULT_SEARCH_LIMIT`].
    pub limit: Option<usize>,

    /// Apply development overrides.
    pub dev_mode: bool,

    /// Directory to start searching from, defaults to current directory.
    pub start_dir: Option<PathBuf>,
}

impl FindOptions {
    /// Construct default search options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search at most `limit` parent directories.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply development overrides.
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Start searching from directory.
    pub fn start_dir(mut self, start_dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(start_dir.into());
        self
    }
}

/// Locate nearest configuration file and load its settings.
///
/// A bare file name is searched for in the start directory and up to `limit`
/// of its parents. A file name with a directory part is taken as an explicit
/// path, which cannot be combined with a start directory or limit.
///
/// # Errors
///
/// - Return [`ConfigError::InvalidFileName`] if file name lacks the `.ini`
///   extension.
/// - Return [`ConfigError::ConflictingOptions`] if explicit path is combined
///   with start directory or limit.
/// - Return [`ConfigError::NotADirectory`] if start directory is not a
///   directory.
/// - Return [`ConfigError::NotFound`] if search exhausts its limit.
/// - Return [`ConfigError::Read`], [`ConfigError::Parse`], or
///   [`ConfigError::MissingSection`] if located file cannot be loaded.
#[instrument(skip(filename), level = "debug")]
pub fn find_config(filename: impl AsRef<Path>, options: FindOptions) -> Result<ConfigDocument> {
    let filename = filename.as_ref();
    if !filename.to_string_lossy().ends_with(CONFIG_EXTENSION) {
        return Err(ConfigError::InvalidFileName {
            filename: filename.to_path_buf(),
        });
    }

    let name = filename
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::InvalidFileName {
            filename: filename.to_path_buf(),
        })?;

    let explicit_dir = filename.parent().filter(|dir| !dir.as_os_str().is_empty());
    let (start_dir, limit) = match explicit_dir {
        Some(dir) => {
            if options.start_dir.is_some() || options.limit.is_some() {
                return Err(ConfigError::ConflictingOptions {
                    filename: filename.to_path_buf(),
                });
            }
            (dir.to_path_buf(), 0)
        }
        None => {
            let start_dir = match options.start_dir {
                Some(dir) if !dir.is_dir() => return Err(ConfigError::NotADirectory { path: dir }),
                Some(dir) => dir,
                None => default_start_dir()?,
            };
            (start_dir, options.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        }
    };

    let not_found = || ConfigError::NotFound {
        filename: name.clone(),
        limit,
    };
    let start_dir = start_dir.canonicalize().map_err(|_| not_found())?;
    let path = start_dir
        .ancestors()
        .take(limit + 1)
        .map(|dir| dir.join(&name))
        .inspect(|candidate| debug!("look for {:?}", candidate.display()))
        .find(|candidate| candidate.is_file())
        .ok_or_else(not_found)?;

    info!("load configuration from {:?}", path.display());
    let mut document = ConfigDocument::load(path)?;
    if options.dev_mode {
        document.apply_dev_overrides();
    }

    Ok(document)
}

/// Settings loaded from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    path: PathBuf,
    settings: Vec<(String, String)>,
}

impl ConfigDocument {
    /// Load settings section of configuration file at path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file cannot be read.
    /// - Return [`ConfigError::Parse`] if file is not valid INI.
    /// - Return [`ConfigError::MissingSection`] if file lacks settings section.
    /// - Return [`ConfigError::DuplicateKey`] if settings define key twice.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = read_to_string(&path).map_err(|err| ConfigError::Read {
            source: err,
            path: path.clone(),
        })?;

        let document = parse_ini(&data).map_err(|err| ConfigError::Parse {
            source: err,
            path: path.clone(),
        })?;

        let section = document
            .section(Some(SETTINGS_SECTION))
            .ok_or_else(|| ConfigError::MissingSection { path: path.clone() })?;

        let mut settings: Vec<(String, String)> = Vec::new();
        for (key, value) in section.iter() {
            if settings.iter().any(|(existing, _)| existing == key) {
                return Err(ConfigError::DuplicateKey {
                    key: key.into(),
                    path: path.clone(),
                });
            }
            settings.push((key.into(), value.into()));
        }

        if let Some(defaults) = document.section(Some(DEFAULT_SECTION)) {
            for (key, value) in defaults.iter() {
                if !settings.iter().any(|(existing, _)| existing == key) {
                    settings.push((key.into(), value.into()));
                }
            }
        }

        let path = std::path::absolute(&path).unwrap_or(path);
        Ok(Self { path, settings })
    }

    /// Absolute path of loaded configuration file.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Look up value of key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Look up value of key that must be defined.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Undefined`] if key is not defined.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| ConfigError::Undefined {
            key: key.into(),
            path: self.path.clone(),
        })
    }

    /// Look up value of key and parse it.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Undefined`] if key is not defined.
    /// - Return [`ConfigError::Cast`] if value cannot be parsed.
    pub fn parse<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.require(key)?;
        value.parse().map_err(|err: T::Err| ConfigError::Cast {
            key: key.into(),
            value: value.into(),
            reason: err.to_string(),
        })
    }

    /// Look up comma separated value of key.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Undefined`] if key is not defined.
    pub fn csv(&self, key: &str) -> Result<Vec<String>> {
        self.require(key).map(decode_csv)
    }

    /// All settings in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.settings
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Replace base values with their development overrides.
    pub fn apply_dev_overrides(&mut self) {
        let overrides: Vec<(String, String)> = self
            .settings
            .iter()
            .filter_map(|(key, value)| {
                key.strip_suffix(DEVMODE_MARKER)
                    .map(|base| (base.to_string(), value.clone()))
            })
            .collect();

        for (base, value) in overrides {
            if let Some((_, target)) = self.settings.iter_mut().find(|(key, _)| *key == base) {
                debug!("development override for {base:?}");
                *target = value;
            }
        }
    }
}

/// Parse INI text in the dialect of configuration files.
pub(crate) fn parse_ini(data: &str) -> std::result::Result<Ini, ini::ParseError> {
    let options = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        enabled_indented_mutiline_value: true,
        ..ParseOption::default()
    };
    Ini::load_from_str_opt(data, options)
}

/// Decode comma separated list.
///
/// Items are trimmed and empty items dropped. Quotes group text that contains
/// commas, and are removed.
pub fn decode_csv(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote = None;

    for ch in value.chars() {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), ch) => current.push(ch),
            (None, '"' | '\'') => quote = Some(ch),
            (None, ',') => items.push(std::mem::take(&mut current)),
            (None, ch) => current.push(ch),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// All possible error types for configuration lookup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File name lacks INI extension.
    #[error("configuration file {:?} must end in .ini", filename.display())]
    InvalidFileName { filename: PathBuf },

    /// Explicit path combined with search options.
    #[error("explicit path {:?} cannot be combined with start directory or limit", filename.display())]
    ConflictingOptions { filename: PathBuf },

    /// Start directory is not a directory.
    #[error("start directory {:?} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// File not found within search limit.
    #[error("could not find {:?} in start directory nor in {limit} parent directories", filename.display())]
    NotFound { filename: PathBuf, limit: usize },

    /// File cannot be read.
    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// File is not valid INI.
    #[error("failed to parse {:?}", path.display())]
    Parse {
        #[source]
        source: ini::ParseError,
        path: PathBuf,
    },

    /// File lacks settings section.
    #[error("{:?} has no [settings] section", path.display())]
    MissingSection { path: PathBuf },

    /// Settings section defines key twice.
    #[error("{key} is defined twice in {:?}", path.display())]
    DuplicateKey { key: String, path: PathBuf },

    /// Key is not defined.
    #[error("{key} not found, declare it in {:?}", path.display())]
    Undefined { key: String, path: PathBuf },

    /// Value cannot be parsed into requested type.
    #[error("value {value:?} of {key} is invalid: {reason}")]
    Cast {
        key: String,
        value: String,
        reason: String,
    },

    /// Default start directory cannot be determined.
    #[error(transparent)]
    Path(#[from] crate::path::PathError),
}

/// Friendly result alias :3
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
