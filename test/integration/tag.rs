// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

#![cfg(feature = "git")]

use crate::{repo::RepoFixture, TreeFixture};

use anyhow::Result;
use deployutils::{
    set_repo_tag,
    tag::{AUTOCOMMIT_MESSAGE, TAG_PREFIX},
    TagOptions, TagOutcome,
};
use pretty_assertions::assert_eq;
use std::fs::write;

#[test]
fn clean_repo_gets_tag_on_head() -> Result<()> {
    let fixture = TreeFixture::new()?;
    let repo = RepoFixture::new(fixture.path())?;
    repo.write_and_commit("README.md", "hello")?;

    let outcome = set_repo_tag(TagOptions {
        repo_path: Some(fixture.path().into()),
        ask: false,
        ..Default::default()
    })?;

    let TagOutcome::Created(name) = outcome else {
        panic!("expected tag to be created, got {outcome:?}");
    };
    assert!(name.starts_with(TAG_PREFIX));

    let tag = repo.repo.revparse_single(&name)?.peel_to_commit()?;
    let head = repo.repo.head()?.peel_to_commit()?;
    assert_eq!(tag.id(), head.id());
    assert_eq!(repo.head_message()?, "chore: add \"README.md\"");
    Ok(())
}

#[test]
fn dirty_repo_is_autocommitted_first() -> Result<()> {
    let fixture = TreeFixture::new()?;
    let repo = RepoFixture::new(fixture.path())?;
    repo.write_and_commit("app.conf", "v1")?;
    write(fixture.path().join("app.conf"), "v2")?;

    let outcome = set_repo_tag(TagOptions {
        ref_name: Some("deploy/release-1".into()),
        message: Some("first release".into()),
        repo_path: Some(fixture.path().into()),
        ask: false,
    })?;

    assert_eq!(outcome, TagOutcome::Created("deploy/release-1".into()));
    assert_eq!(repo.head_message()?, AUTOCOMMIT_MESSAGE);

    let tag = repo.repo.revparse_single("deploy/release-1")?;
    let tag = tag.as_tag().ok_or_else(|| anyhow::anyhow!("not annotated"))?;
    assert_eq!(tag.message().map(str::trim), Some("first release"));
    assert!(repo.repo.statuses(None)?.is_empty());
    Ok(())
}
