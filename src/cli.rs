// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Standard argument surface of deployment scripts.
//!
//! Every deployment script takes the same handful of arguments, so they are
//! declared once here. Construct a [`DeployArgParser`] and hand it the
//! argument vector, or use [`parse_args`] to do both in one go.

use crate::connection::Target;

use clap::{Args, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use tracing::debug;

/// Parsed arguments of a deployment script.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(about = "Deploy application to target")]
pub struct DeployArgs {
    /// Deployment target.
    #[arg(value_enum, value_name = "target")]
    pub target: Target,

    /// Omit security confirmation.
    #[arg(short, long)]
    pub r#unsafe: bool,

    /// Flag for initial deployment.
    #[arg(short, long)]
    pub initial: bool,

    /// Use symlinking instead of copying (local deployment only).
    #[arg(short = 'l', long)]
    pub symlink: bool,
}

/// Parser of deployment script arguments.
#[derive(Debug, Clone)]
pub struct DeployArgParser {
    command: clap::Command,
}

impl DeployArgParser {
    /// Construct new parser.
    pub fn new() -> Self {
        Self {
            command: DeployArgs::command(),
        }
    }

    /// Construct new parser with program name used in usage text.
    pub fn with_name(name: impl Into<clap::builder::Str>) -> Self {
        Self {
            command: DeployArgs::augment_args(clap::Command::new(name)),
        }
    }

    /// Parse argument vector, program name excluded.
    ///
    /// # Errors
    ///
    /// - Return [`ArgsError::Usage`] if arguments are missing or invalid.
    /// - Return [`ArgsError::Incompatible`] if symlinking is requested for a
    ///   remote target.
    pub fn parse<I, T>(&self, argv: I) -> Result<DeployArgs>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let program = OsString::from(self.command.get_name());
        let argv = std::iter::once(program).chain(argv.into_iter().map(Into::into));
        let matches = self.command.clone().try_get_matches_from(argv)?;
        let args = DeployArgs::from_arg_matches(&matches)?;

        if args.target != Target::Local && args.symlink {
            return Err(ArgsError::Incompatible {
                target: args.target,
            });
        }

        debug!("deployment arguments {args:?}");
        Ok(args)
    }
}

impl Default for DeployArgParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse deployment script arguments with a fresh parser.
///
/// # Errors
///
/// - Return [`ArgsError`] if arguments are invalid.
pub fn parse_args<I, T>(argv: I) -> Result<DeployArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    DeployArgParser::new().parse(argv)
}

/// All possible error types for argument parsing.
#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    /// Arguments are missing or invalid.
    #[error(transparent)]
    Usage(#[from] clap::Error),

    /// Options contradict each other.
    #[error("incompatible options: target: {target} and --symlink: true")]
    Incompatible { target: Target },
}

impl ArgsError {
    /// Exit code a script should terminate with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(error) => error.exit_code(),
            Self::Incompatible { .. } => 2,
        }
    }

    /// Print usage text or error message, and terminate process.
    pub fn exit(&self) -> ! {
        match self {
            Self::Usage(error) => error.exit(),
            Self::Incompatible { .. } => {
                eprintln!("error: {self}");
                std::process::exit(self.exit_code())
            }
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = ArgsError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn parse_unsafe_local() -> anyhow::Result<()> {
        let args = parse_args(["-u", "local"])?;
        assert_eq!(
            args,
            DeployArgs {
                target: Target::Local,
                r#unsafe: true,
                initial: false,
                symlink: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_long_flags() -> anyhow::Result<()> {
        let parser = DeployArgParser::with_name("deploy.rs");
        let args = parser.parse(["remote", "--initial", "--unsafe"])?;
        assert_eq!(args.target, Target::Remote);
        assert!(args.initial);
        assert!(args.r#unsafe);

        let args = parser.parse(["local", "--symlink"])?;
        assert!(args.symlink);
        Ok(())
    }

    #[test]
    fn parser_keeps_program_name() {
        let parser = DeployArgParser::with_name("deploy.rs");
        assert_eq!(parser.command.get_name(), "deploy.rs");
        assert_eq!(DeployArgParser::new().command.get_name(), "deployutils");
    }

    #[test]
    fn symlink_is_local_only() {
        let result = parse_args(["-l", "remote"]);
        assert!(matches!(
            result,
            Err(ArgsError::Incompatible {
                target: Target::Remote
            })
        ));
    }

    #[test_case(&[]; "missing target")]
    #[test_case(&["staging"]; "unknown target")]
    #[test_case(&["local", "--bogus"]; "unknown flag")]
    #[test]
    fn usage_errors_exit_nonzero(argv: &[&str]) {
        let error = parse_args(argv.iter().copied()).unwrap_err();
        assert!(matches!(error, ArgsError::Usage(_)));
        assert_ne!(error.exit_code(), 0);
    }
}
