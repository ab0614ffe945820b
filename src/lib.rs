// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Building blocks for deployment scripts.
//!
//! A deployment script typically parses a target from its arguments, loads
//! settings from a nearby INI file, renders configuration templates, pushes
//! files to the target with rsync, and runs commands there through a
//! [`StateConnection`].
//!
//! ```no_run
//! use deployutils::{
//!     find_config, parse_args, FindOptions, RunOptions, StateConnection, Target, TargetSpec,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let args = parse_args(std::env::args().skip(1))?;
//! let config = find_config("config.ini", FindOptions::new())?;
//!
//! let mut connection = match args.target {
//!     Target::Local => StateConnection::local(),
//!     Target::Remote => StateConnection::remote(
//!         config.require("remote_server")?,
//!         config.require("remote_user")?,
//!     )?,
//! };
//!
//! connection.chdir(Some("~/app"), TargetSpec::Both, false)?;
//! connection.run("ls -la", RunOptions::new())?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod http;
pub mod package;
pub mod path;
pub mod prompt;
pub mod style;
pub mod sync;
pub mod tag;
pub mod template;

#[doc(inline)]
pub use cli::{parse_args, DeployArgParser, DeployArgs};

#[doc(inline)]
pub use config::{find_config, ConfigDocument, FindOptions};

#[doc(inline)]
pub use connection::{
    result::CommandResult, OnFailure, RunOptions, StateConnection, Target, TargetSpec, VenvScope,
};

#[doc(inline)]
pub use http::{ensure_http_response, HttpCheck};

#[doc(inline)]
pub use package::PackageDeployment;

#[doc(inline)]
pub use prompt::{confirm_deployment, DeploymentNotice};

#[doc(inline)]
pub use sync::{SyncDirection, SyncOptions};

#[doc(inline)]
pub use tag::{set_repo_tag, TagOptions, TagOutcome};

#[doc(inline)]
pub use template::{render_structured_template, render_template};
