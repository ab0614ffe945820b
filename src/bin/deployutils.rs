// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use deployutils::{
    config::redact::redact_secrets,
    ensure_http_response, find_config, render_structured_template, render_template, set_repo_tag,
    template::{DataFormat, TemplateContext},
    FindOptions, OnFailure, RunOptions, StateConnection, TagOptions, TagOutcome, Target,
    TargetSpec, VenvScope,
};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::{fs::read_to_string, path::{Path, PathBuf}, process::exit, time::Duration};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "deployutils [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<i32> {
        match self.command {
            Command::Render(opts) => run_render(opts),
            Command::RenderData(opts) => run_render_data(opts),
            Command::Config(opts) => run_config(opts),
            Command::Redact(opts) => run_redact(opts),
            Command::Tag(opts) => run_tag(opts),
            Command::CheckHttp(opts) => run_check_http(opts),
            Command::Exec(opts) => run_exec(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Render template file into its target file.
    #[command(override_usage = "deployutils render [options] <template>")]
    Render(RenderOptions),

    /// Deep merge overrides into JSON or YAML document.
    #[command(override_usage = "deployutils render-data [options] <base> <target>")]
    RenderData(RenderDataOptions),

    /// Locate configuration file and show its settings.
    #[command(override_usage = "deployutils config [options] <filename> [<key>]")]
    Config(ConfigOptions),

    /// Write copy of configuration file with secrets replaced.
    #[command(override_usage = "deployutils redact <path>")]
    Redact(RedactOptions),

    /// Tag current revision of git repository.
    #[command(override_usage = "deployutils tag [options]")]
    Tag(TagArgs),

    /// Check that URL answers with expected status code.
    #[command(override_usage = "deployutils check-http [options] <url>")]
    CheckHttp(CheckHttpOptions),

    /// Run command through local or remote connection.
    #[command(override_usage = "deployutils exec [options] <target> -- <command>...")]
    Exec(ExecOptions),
}

#[derive(Args, Clone, Debug)]
struct RenderOptions {
    /// Path to template, file name must contain "template_".
    #[arg(required = true, value_name = "template")]
    pub template: PathBuf,

    /// JSON or YAML file providing context mapping.
    #[arg(short, long, value_name = "path")]
    pub context: Option<PathBuf>,

    /// Extra context entry.
    #[arg(short, long, value_name = "key=value", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Write result here instead of derived target path.
    #[arg(short, long, value_name = "path")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct RenderDataOptions {
    /// Base document.
    #[arg(required = true, value_name = "base")]
    pub base: PathBuf,

    /// Path to write merged JSON document to.
    #[arg(required = true, value_name = "target")]
    pub target: PathBuf,

    /// JSON or YAML file providing override mapping.
    #[arg(short, long, value_name = "path")]
    pub overrides: Option<PathBuf>,

    /// Format of base document, inferred from extension by default.
    #[arg(short, long, value_enum, value_name = "format")]
    pub format: Option<DataFormat>,
}

#[derive(Args, Clone, Debug)]
struct ConfigOptions {
    /// Name of or explicit path to configuration file.
    #[arg(required = true, value_name = "filename")]
    pub filename: PathBuf,

    /// Only show value of this key.
    #[arg(value_name = "key")]
    pub key: Option<String>,

    /// Directory to start searching from.
    #[arg(short, long, value_name = "dir")]
    pub start_dir: Option<PathBuf>,

    /// Amount of parent directories to search.
    #[arg(short, long, value_name = "n")]
    pub limit: Option<usize>,

    /// Apply development overrides.
    #[arg(short, long)]
    pub dev: bool,
}

#[derive(Args, Clone, Debug)]
struct RedactOptions {
    /// Configuration file holding secrets.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

#[derive(Args, Clone, Debug)]
struct TagArgs {
    /// Name of tag, defaults to deploy/<timestamp>.
    #[arg(short, long, value_name = "name")]
    pub name: Option<String>,

    /// Message of tag.
    #[arg(short, long, value_name = "text")]
    pub message: Option<String>,

    /// Path to repository, defaults to current directory.
    #[arg(short, long, value_name = "path")]
    pub repo: Option<PathBuf>,

    /// Do not ask before tagging.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Clone, Debug)]
struct CheckHttpOptions {
    /// URL to request.
    #[arg(required = true, value_name = "url")]
    pub url: String,

    /// Status code to expect.
    #[arg(short, long, default_value_t = 200, value_name = "code")]
    pub status: u16,

    /// Seconds to wait before request.
    #[arg(short = 'w', long, default_value_t = 0.0, value_name = "seconds")]
    pub sleep: f64,
}

#[derive(Args, Clone, Debug)]
struct ExecOptions {
    /// Connection target.
    #[arg(required = true, value_enum, value_name = "target")]
    pub target: Target,

    /// Remote host.
    #[arg(short = 'H', long, value_name = "host", required_if_eq("target", "remote"))]
    pub host: Option<String>,

    /// Remote user.
    #[arg(short, long, value_name = "user", required_if_eq("target", "remote"))]
    pub user: Option<String>,

    /// Working directory to run command in.
    #[arg(short, long, value_name = "dir")]
    pub dir: Option<String>,

    /// Environment variable to export.
    #[arg(short, long, value_name = "key=value", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Virtual environment activation script.
    #[arg(long, value_name = "path")]
    pub venv: Option<String>,

    /// Report nonzero exit code instead of failing.
    #[arg(short, long)]
    pub tolerate: bool,

    /// Command to run.
    #[arg(required = true, last = true, value_name = "command")]
    pub command: Vec<String>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    match Cli::parse().run() {
        Ok(code) => exit(code),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

fn parse_key_value(input: &str) -> Result<(String, String)> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got {input:?}"))?;
    Ok((key.trim().to_string(), value.to_string()))
}

fn load_mapping(path: &Path) -> Result<TemplateContext> {
    let data = read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
    let value = DataFormat::from_path(path)?.parse(&data)?;

    match value {
        Value::Object(mapping) => Ok(mapping),
        _ => Err(anyhow!("{path:?} does not hold a mapping")),
    }
}

fn run_render(opts: RenderOptions) -> Result<i32> {
    let mut context = match &opts.context {
        Some(path) => load_mapping(path)?,
        None => TemplateContext::new(),
    };
    for (key, value) in opts.set {
        context.insert(key, Value::String(value));
    }

    render_template(&opts.template, &context, opts.output.as_deref())?;
    Ok(0)
}

fn run_render_data(opts: RenderDataOptions) -> Result<i32> {
    let overrides = match &opts.overrides {
        Some(path) => load_mapping(path)?,
        None => TemplateContext::new(),
    };

    render_structured_template(&opts.base, &overrides, &opts.target, opts.format)?;
    Ok(0)
}

fn run_config(opts: ConfigOptions) -> Result<i32> {
    let mut find_opts = FindOptions::new().dev_mode(opts.dev);
    find_opts.limit = opts.limit;
    find_opts.start_dir = opts.start_dir;

    let config = find_config(&opts.filename, find_opts)?;
    match opts.key {
        Some(key) => println!("{}", config.require(&key)?),
        None => {
            println!("# {}", config.path().display());
            for (key, value) in config.iter() {
                println!("{key} = {value}");
            }
        }
    }

    Ok(0)
}

fn run_redact(opts: RedactOptions) -> Result<i32> {
    let target = redact_secrets(&opts.path)?;
    println!("{}", target.display());
    Ok(0)
}

fn run_tag(opts: TagArgs) -> Result<i32> {
    let outcome = set_repo_tag(TagOptions {
        ref_name: opts.name,
        message: opts.message,
        repo_path: opts.repo,
        ask: !opts.yes,
    })?;

    Ok(match outcome {
        TagOutcome::Created(_) | TagOutcome::Declined => 0,
        TagOutcome::NotARepository | TagOutcome::Unavailable => 1,
    })
}

fn run_check_http(opts: CheckHttpOptions) -> Result<i32> {
    let delay = Duration::try_from_secs_f64(opts.sleep)
        .with_context(|| format!("invalid value for sleep: {}", opts.sleep))?;
    let check = ensure_http_response(&opts.url, opts.status, delay)?;
    Ok(check.code())
}

fn run_exec(opts: ExecOptions) -> Result<i32> {
    let mut connection = match opts.target {
        Target::Local => StateConnection::local(),
        Target::Remote => StateConnection::remote(
            opts.host.unwrap_or_default(),
            opts.user.unwrap_or_default(),
        )?,
    };

    for (key, value) in opts.env {
        connection.set_env(key, value);
    }

    if let Some(venv) = &opts.venv {
        connection.activate_venv(venv, VenvScope::Both)?;
    }

    if let Some(dir) = &opts.dir {
        let result = connection.chdir(Some(dir.as_str()), TargetSpec::Both, false)?;
        if !result.success() {
            return Ok(result.exit_code);
        }
    }

    let on_failure = if opts.tolerate {
        OnFailure::Tolerate
    } else {
        OnFailure::Smart
    };
    let options = RunOptions::new()
        .target_spec(TargetSpec::Both)
        .on_failure(on_failure);
    let result = connection.run(opts.command, options)?;

    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr.trim_end());
    }

    Ok(result.exit_code)
}
