// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use anyhow::Result;
use std::{
    fs::{create_dir_all, write},
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// Directory tree built inside a temporary directory.
pub(crate) struct TreeFixture {
    root: TempDir,
}

impl TreeFixture {
    pub(crate) fn new() -> Result<Self> {
        Ok(Self {
            root: tempfile::tempdir()?,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        self.root.path()
    }

    /// Write file relative to root, creating parent directories on the way.
    pub(crate) fn file(&self, relative: impl AsRef<Path>, contents: impl AsRef<str>) -> Result<PathBuf> {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        write(&path, contents.as_ref())?;
        Ok(path)
    }

    /// Create directory relative to root.
    pub(crate) fn dir(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.root.path().join(relative);
        create_dir_all(&path)?;
        Ok(path)
    }
}

/// Check if binary can be found in `PATH`.
pub(crate) fn has_program(program: &str) -> bool {
    std::process::Command::new(program)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok()
}

#[cfg(feature = "git")]
pub(crate) mod repo {
    use anyhow::Result;
    use git2::{Repository, RepositoryInitOptions};
    use std::{fs::write, path::Path};

    /// Normal repository with real working tree.
    pub(crate) struct RepoFixture {
        pub(crate) repo: Repository,
    }

    impl RepoFixture {
        pub(crate) fn new(path: impl AsRef<Path>) -> Result<Self> {
            let mut opts = RepositoryInitOptions::new();
            opts.initial_head("main");
            let repo = Repository::init_opts(path.as_ref(), &opts)?;

            // INVARIANT: Always provide valid name and email.
            //   - Git will complain if this is not set in CI/CD environments.
            let mut config = repo.config()?;
            config.set_str("user.name", "John Doe")?;
            config.set_str("user.email", "john@doe.com")?;

            Ok(Self { repo })
        }

        /// Write file into working tree, stage it, and commit it.
        pub(crate) fn write_and_commit(
            &self,
            filename: impl AsRef<Path>,
            contents: impl AsRef<str>,
        ) -> Result<()> {
            let workdir = self.repo.workdir().ok_or_else(|| anyhow::anyhow!("bare repo"))?;
            write(workdir.join(filename.as_ref()), contents.as_ref())?;

            let mut index = self.repo.index()?;
            index.add_path(filename.as_ref())?;
            index.write()?;
            let tree = self.repo.find_tree(index.write_tree()?)?;

            // INVARIANT: Always determine latest parent commits to append to.
            let signature = self.repo.signature()?;
            let parent = match self.repo.head() {
                Ok(head) => Some(head.peel_to_commit()?),
                Err(_) => None,
            };
            let parents = parent.iter().collect::<Vec<_>>();

            self.repo.commit(
                Some("HEAD"),
                &signature,
                &signature,
                format!("chore: add {:?}", filename.as_ref()).as_ref(),
                &tree,
                &parents,
            )?;

            Ok(())
        }

        /// Message of commit HEAD points to.
        pub(crate) fn head_message(&self) -> Result<String> {
            let commit = self.repo.head()?.peel_to_commit()?;
            Ok(commit.message().unwrap_or_default().trim().to_string())
        }
    }
}
