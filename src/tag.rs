// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Mark deployed revisions in git.
//!
//! Tagging is a courtesy, never a reason to abort a deployment. Whenever the
//! repository cannot be used, or git support was compiled out, a warning is
//! logged and a [`TagOutcome`] explains what happened.

use crate::prompt::{ask, PromptError};

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{instrument, warn};

/// Message of commit created for uncommitted changes before tagging.
pub const AUTOCOMMIT_MESSAGE: &str = "autocommit during deployment";

/// Prefix of default tag names.
pub const TAG_PREFIX: &str = "deploy/";

/// Options for [`set_repo_tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOptions {
    /// Name of tag, defaults to [`default_tag_name`].
    pub ref_name: Option<String>,

    /// Message of annotated tag, defaults to tag name.
    pub message: Option<String>,

    /// Repository to tag, defaults to current directory.
    pub repo_path: Option<PathBuf>,

    /// Ask before tagging.
    pub ask: bool,
}

impl Default for TagOptions {
    fn default() -> Self {
        Self {
            ref_name: None,
            message: None,
            repo_path: None,
            ask: true,
        }
    }
}

/// Result of tagging attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagOutcome {
    /// Tag was created with name.
    Created(String),

    /// User declined tagging.
    Declined,

    /// Path is not a git repository.
    NotARepository,

    /// Git support is not available in this build.
    Unavailable,
}

/// Default tag name, `deploy/<local time>_<utc offset>`.
pub fn default_tag_name() -> String {
    format!("{TAG_PREFIX}{}", Local::now().format("%Y-%m-%d__%H-%M-%S_%z"))
}

/// Tag current revision of repository.
///
/// Uncommitted changes to tracked files are committed with
/// [`AUTOCOMMIT_MESSAGE`] first, so the tag always covers what is being
/// deployed.
///
/// # Errors
///
/// - Return [`TagError::Prompt`] if user cannot be asked.
/// - Return [`TagError::NotADirectory`] if repository path is not a directory.
/// - Return [`TagError::Git`] if committing or tagging fails.
#[instrument(skip(options), level = "debug")]
pub fn set_repo_tag(options: TagOptions) -> Result<TagOutcome> {
    if !cfg!(feature = "git") {
        warn!("git support is not available, omit tagging");
        return Ok(TagOutcome::Unavailable);
    }

    if options.ask && !ask("Should a new tag be created for the git repo?")? {
        return Ok(TagOutcome::Declined);
    }

    let repo_path = match options.repo_path {
        Some(path) => path,
        None => std::env::current_dir().map_err(TagError::CurrentDir)?,
    };
    if !repo_path.is_dir() {
        return Err(TagError::NotADirectory { path: repo_path });
    }

    let ref_name = options.ref_name.unwrap_or_else(default_tag_name);
    let message = options.message.unwrap_or_else(|| ref_name.clone());
    tag_repository(&repo_path, ref_name, &message)
}

#[cfg(feature = "git")]
fn tag_repository(repo_path: &Path, ref_name: String, message: &str) -> Result<TagOutcome> {
    use git2::{ErrorCode, ObjectType, Repository, StatusOptions};
    use tracing::info;

    let repo = match Repository::open(repo_path) {
        Ok(repo) => repo,
        Err(error) if error.code() == ErrorCode::NotFound => {
            warn!("could not find git repository at {:?}, omit tagging", repo_path.display());
            return Ok(TagOutcome::NotARepository);
        }
        Err(error) => return Err(error.into()),
    };

    let mut status_opts = StatusOptions::new();
    status_opts.include_untracked(false).include_ignored(false);
    let dirty = !repo.statuses(Some(&mut status_opts))?.is_empty();

    let signature = repo.signature()?;
    if dirty {
        // INVARIANT: Only stage modifications to tracked files.
        let mut index = repo.index()?;
        index.update_all(["*"], None)?;
        index.write()?;

        let tree = repo.find_tree(index.write_tree()?)?;
        let parent = repo.head()?.peel_to_commit()?;
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            AUTOCOMMIT_MESSAGE,
            &tree,
            &[&parent],
        )?;
        info!("committed pending changes: {AUTOCOMMIT_MESSAGE}");
    }

    let target = repo.head()?.peel(ObjectType::Commit)?;
    repo.tag(&ref_name, &target, &signature, message, false)?;
    println!("Created tag for repo: `{ref_name}`.");

    Ok(TagOutcome::Created(ref_name))
}

#[cfg(not(feature = "git"))]
fn tag_repository(_repo_path: &Path, _ref_name: String, _message: &str) -> Result<TagOutcome> {
    Ok(TagOutcome::Unavailable)
}

/// All possible error types for repository tagging.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// User cannot be asked.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Current directory cannot be determined.
    #[error("failed to determine current directory")]
    CurrentDir(#[source] std::io::Error),

    /// Repository path is not a directory.
    #[error("repository path {:?} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    /// Git operation fails.
    #[cfg(feature = "git")]
    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = TagError> = std::result::Result<T, E>;
