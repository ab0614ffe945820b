// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::TreeFixture;

use anyhow::Result;
use deployutils::{render_structured_template, render_template, template::TemplateContext};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs::read_to_string;

#[test]
fn render_config_next_to_template() -> Result<()> {
    let fixture = TreeFixture::new()?;
    let template = fixture.file(
        "deploy/template_nginx.conf",
        indoc! {r#"
            # {{ warning }}
            server_name {{ context.server_name }};
            {% for port in ports %}listen {{ port }};
            {% endfor %}
        "#},
    )?;

    let context: TemplateContext = serde_json::from_value(json!({
        "server_name": "example.org",
        "ports": [80, 443],
    }))?;

    let first = render_template(&template, &context, None)?;
    let target = fixture.path().join("deploy/nginx.conf");
    assert_eq!(read_to_string(&target)?, first);
    assert!(first.starts_with("# This file was autogenerated from the template: template_nginx.conf"));
    assert!(first.contains("server_name example.org;"));
    assert!(first.contains("listen 80;"));
    assert!(first.contains("listen 443;"));

    let second = render_template(&template, &context, None)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn merged_document_is_written_as_json() -> Result<()> {
    let fixture = TreeFixture::new()?;
    let base = fixture.file(
        "settings.yml",
        indoc! {r#"
            database:
              host: localhost
              port: 5432
            debug: false
        "#},
    )?;
    let target = fixture.path().join("out/settings.json");

    let overrides: TemplateContext = serde_json::from_value(json!({
        "database": { "host": "db.internal" },
        "debug": true,
    }))?;
    render_structured_template(&base, &overrides, &target, None)?;

    let written: Value = serde_json::from_str(&read_to_string(&target)?)?;
    assert_eq!(
        written,
        json!({
            "database": { "host": "db.internal", "port": 5432 },
            "debug": true,
        })
    );
    Ok(())
}
