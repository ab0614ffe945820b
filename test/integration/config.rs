// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::TreeFixture;

use anyhow::Result;
use deployutils::{config::ConfigError, find_config, FindOptions};
use indoc::indoc;
use pretty_assertions::assert_eq;

const SECRETS: &str = indoc! {r#"
    [settings]
    remote_server = example.org
    remote_user = deploy
    deployment_path = ~/shop
    ALLOWED_HOSTS = example.org, www.example.org
    ALLOWED_HOSTS__DEVMODE = localhost
"#};

#[test]
fn nearest_config_above_script_dir() -> Result<()> {
    let fixture = TreeFixture::new()?;
    fixture.file("project/config.ini", SECRETS)?;
    let script_dir = fixture.dir("project/deployment/scripts")?;

    let config = find_config("config.ini", FindOptions::new().start_dir(&script_dir))?;
    assert_eq!(config.require("remote_server")?, "example.org");
    assert_eq!(
        config.csv("ALLOWED_HOSTS")?,
        vec!["example.org", "www.example.org"]
    );

    let config = find_config(
        "config.ini",
        FindOptions::new().start_dir(&script_dir).dev_mode(true),
    )?;
    assert_eq!(config.csv("ALLOWED_HOSTS")?, vec!["localhost"]);
    Ok(())
}

#[test]
fn nearest_config_wins_over_farther_one() -> Result<()> {
    let fixture = TreeFixture::new()?;
    fixture.file("config.ini", "[settings]\nlevel = far\n")?;
    fixture.file("a/b/config.ini", "[settings]\nlevel = near\n")?;
    let start = fixture.dir("a/b/c")?;

    let config = find_config("config.ini", FindOptions::new().start_dir(&start))?;
    assert_eq!(config.get("level"), Some("near"));
    Ok(())
}

#[test]
fn limit_bounds_search() -> Result<()> {
    let fixture = TreeFixture::new()?;
    fixture.file("config.ini", SECRETS)?;
    let start = fixture.dir("1/2/3/4/5")?;

    let result = find_config("config.ini", FindOptions::new().start_dir(&start));
    assert!(matches!(result, Err(ConfigError::NotFound { limit: 4, .. })));

    let config = find_config("config.ini", FindOptions::new().start_dir(&start).limit(5))?;
    assert_eq!(config.get("remote_user"), Some("deploy"));
    Ok(())
}
