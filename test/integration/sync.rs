// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{has_program, TreeFixture};

use anyhow::Result;
use deployutils::{StateConnection, SyncOptions, TargetSpec};
use std::fs::read_to_string;

#[test]
fn local_upload_mirrors_tree() -> Result<()> {
    if !has_program("rsync") {
        return Ok(());
    }

    let fixture = TreeFixture::new()?;
    fixture.file("src/app.conf", "listen 80")?;
    fixture.file("src/static/site.css", "body {}")?;
    fixture.file("src/.git/HEAD", "ref: refs/heads/main")?;
    let stale = fixture.file("dest/stale.txt", "old")?;

    let source = format!("{}/", fixture.path().join("src").display());
    let dest = fixture.path().join("dest");
    let connection = StateConnection::local();
    let result = connection.upload(
        &source,
        dest.to_string_lossy(),
        SyncOptions::new(TargetSpec::Local)
            .filters(["--exclude=.git/"])
            .delete(),
    )?;

    assert!(result.success());
    assert_eq!(read_to_string(dest.join("app.conf"))?, "listen 80");
    assert!(dest.join("static/site.css").is_file());
    assert!(!dest.join(".git").exists());
    assert!(!stale.exists());
    Ok(())
}

#[test]
fn print_only_transfer_touches_nothing() -> Result<()> {
    let fixture = TreeFixture::new()?;
    fixture.file("src/app.conf", "listen 80")?;
    let dest = fixture.path().join("dest");

    let connection = StateConnection::local();
    let result = connection.upload(
        fixture.path().join("src").to_string_lossy(),
        dest.to_string_lossy(),
        SyncOptions::new(TargetSpec::Local).print_only(),
    )?;

    assert!(result.success());
    assert!(!dest.exists());
    Ok(())
}
