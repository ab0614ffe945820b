// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::TreeFixture;

use anyhow::Result;
use deployutils::{
    connection::ConnectionError, CommandResult, OnFailure, RunOptions, StateConnection,
    TargetSpec,
};
use pretty_assertions::assert_eq;

fn local_opts() -> RunOptions {
    RunOptions::new().target_spec(TargetSpec::Local).hide()
}

#[test]
fn exported_variable_reaches_local_command() -> Result<()> {
    let mut connection = StateConnection::local();
    connection.set_env("TEST_ENV_VAR", "ABC-XYZ");

    let result = connection.run("echo $TEST_ENV_VAR", local_opts())?;
    assert!(result.stdout.contains("ABC-XYZ"));
    assert_eq!(result.exit_code, 0);
    Ok(())
}

#[test]
fn argv_commands_are_quoted() -> Result<()> {
    let mut connection = StateConnection::local();
    let result = connection.run(vec!["printf", "%s|", "two words", "$HOME"], local_opts())?;
    assert_eq!(result.stdout, "two words|$HOME|");
    Ok(())
}

#[test]
fn chdir_applies_to_later_commands() -> Result<()> {
    let fixture = TreeFixture::new()?;
    let sub = fixture.dir("releases/current")?;
    let base = fixture.path().join("releases");

    let mut connection = StateConnection::local();
    let result = connection.chdir(base.to_str(), TargetSpec::Local, false)?;
    assert!(result.success());

    let result = connection.chdir(Some("current"), TargetSpec::Local, false)?;
    assert!(result.success());
    assert!(connection
        .working_dir()
        .is_some_and(|dir| dir.ends_with("releases/current")));

    let result = connection.run("pwd", local_opts())?;
    assert!(result.stdout.trim().ends_with("current"));
    assert!(sub.is_dir());
    Ok(())
}

#[test]
fn chdir_into_missing_directory_reverts() -> Result<()> {
    let fixture = TreeFixture::new()?;
    let base = fixture.dir("app")?;

    let mut connection = StateConnection::local();
    connection.chdir(base.to_str(), TargetSpec::Both, false)?;
    let before = connection.working_dir().map(ToString::to_string);

    let result = connection.chdir(Some("missing"), TargetSpec::Both, true)?;
    assert!(!result.success());
    assert_eq!(connection.working_dir().map(ToString::to_string), before);
    Ok(())
}

#[test]
fn failing_command_is_reported_by_mode() -> Result<()> {
    let mut connection = StateConnection::local();

    let error = connection
        .run("echo oops >&2; exit 3", local_opts())
        .unwrap_err();
    match error {
        ConnectionError::CommandFailed {
            exit_code, stderr, ..
        } => {
            assert_eq!(exit_code, 3);
            assert_eq!(stderr.trim(), "oops");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(connection.last_result().map(|result| result.exit_code), Some(3));

    let result = connection.run(
        "exit 4",
        local_opts().on_failure(OnFailure::Tolerate),
    )?;
    assert_eq!(result.exit_code, 4);

    let result = connection.run("exit 5", local_opts().on_failure(OnFailure::Suppress))?;
    assert_eq!(result.exit_code, 5);
    assert_eq!(connection.last_result().map(|result| result.exit_code), Some(4));
    Ok(())
}

#[test]
fn remote_only_command_is_omitted_locally() -> Result<()> {
    let fixture = TreeFixture::new()?;
    let marker = fixture.path().join("touched");

    let mut connection = StateConnection::local();
    let result = connection.run(
        format!("touch {}", marker.display()),
        RunOptions::new().target_spec(TargetSpec::Remote),
    )?;

    assert_eq!(result, CommandResult::omitted());
    assert!(!marker.exists());
    Ok(())
}
