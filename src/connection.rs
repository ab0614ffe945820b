// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Stateful command dispatch.
//!
//! A [`StateConnection`] represents one deployment session against either the
//! local machine or a remote host. It remembers a logical working directory,
//! environment variables to export, and an optional virtual environment to
//! activate, and prefixes every dispatched command accordingly.
//!
//! # Targets and Target Specs
//!
//! The __target__ of a connection is fixed at construction: either `local` or
//! `remote`. Each individual call additionally carries a __target spec__ of
//! `local`, `remote`, or `both`. A call whose target spec excludes the target of
//! the connection is not executed at all. Instead it reports a successful
//! __omitted__ result. This lets one deployment script describe both a local
//! test deployment and the real remote one, with steps that only make sense
//! for one of them.
//!
//! # Failure Handling
//!
//! By default a nonzero exit code is turned into
//! [`ConnectionError::CommandFailed`] carrying the captured standard error. See
//! [`OnFailure`] for the tolerant modes. Authentication failures are never
//! raised. They are reported with a hint and returned as failed results.

pub mod command;
pub mod executor;
pub mod result;

use crate::{
    connection::{
        command::{CommandPlan, ShellCommand},
        executor::{Executor, LocalShell, SshSession, TransportError},
        result::CommandResult,
    },
    style::{bred, bright, dim},
};

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, instrument, warn};

/// Hint shown whenever ssh authentication fails.
pub const SSH_AGENT_HINT: &str = "hint: use something like `eval $(ssh-agent); ssh-add -t 1m`";

/// Fixed execution backend of a connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Target {
    /// Run on local machine.
    Local,

    /// Run on remote host.
    #[default]
    Remote,
}

impl Display for Target {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Local => fmt.write_str("local"),
            Self::Remote => fmt.write_str("remote"),
        }
    }
}

/// Per-call routing filter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TargetSpec {
    /// Only run on local connections.
    Local,

    /// Only run on remote connections.
    #[default]
    Remote,

    /// Run on any connection.
    Both,
}

impl TargetSpec {
    /// Check if target spec lets a call through to given target.
    pub fn includes(self, target: Target) -> bool {
        matches!(
            (self, target),
            (Self::Both, _) | (Self::Local, Target::Local) | (Self::Remote, Target::Remote)
        )
    }
}

impl Display for TargetSpec {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Local => fmt.write_str("local"),
            Self::Remote => fmt.write_str("remote"),
            Self::Both => fmt.write_str("both"),
        }
    }
}

/// Scope in which an activated virtual environment applies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum VenvScope {
    /// Only for calls that are not restricted to local.
    #[default]
    Remote,

    /// For all calls.
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VirtualEnv {
    activate_script: String,
    scope: VenvScope,
}

impl VirtualEnv {
    fn applies_to(&self, target_spec: TargetSpec) -> bool {
        match self.scope {
            VenvScope::Both => true,
            VenvScope::Remote => target_spec != TargetSpec::Local,
        }
    }
}

/// How to treat commands that fail.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Return error carrying standard error on nonzero exit code.
    #[default]
    Smart,

    /// Return result as-is, even on nonzero exit code or transport failure.
    Tolerate,

    /// Return synthetic failed result without captured output on nonzero exit
    /// code or transport failure.
    Suppress,
}

/// Options for [`StateConnection::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Run inside tracked working directory.
    pub use_working_dir: bool,

    /// Do not echo command and its output.
    pub hide: bool,

    /// Failure handling mode.
    pub on_failure: OnFailure,

    /// Routing filter.
    pub target_spec: TargetSpec,

    /// Activate tracked virtual environment.
    pub use_venv: bool,

    /// Only echo command, never execute it.
    pub print_only: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_working_dir: true,
            hide: false,
            on_failure: OnFailure::Smart,
            target_spec: TargetSpec::Remote,
            use_venv: true,
            print_only: false,
        }
    }
}

impl RunOptions {
    /// Construct default run options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route call by target spec.
    pub fn target_spec(mut self, target_spec: TargetSpec) -> Self {
        self.target_spec = target_spec;
        self
    }

    /// Do not echo command and output.
    pub fn hide(mut self) -> Self {
        self.hide = true;
        self
    }

    /// Set failure handling mode.
    pub fn on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Ignore tracked working directory.
    pub fn without_working_dir(mut self) -> Self {
        self.use_working_dir = false;
        self
    }

    /// Ignore tracked virtual environment.
    pub fn without_venv(mut self) -> Self {
        self.use_venv = false;
        self
    }

    /// Only echo command.
    pub fn print_only(mut self) -> Self {
        self.print_only = true;
        self
    }
}

/// Deployment session against local machine or remote host.
///
/// Not meant to be shared between threads. Every call mutates bookkeeping
/// state, so calls must be serialized by the caller.
#[derive(Debug)]
pub struct StateConnection {
    target: Target,
    remote_host: Option<String>,
    remote_user: Option<String>,
    working_dir: Option<String>,
    venv: Option<VirtualEnv>,
    env: BTreeMap<String, String>,
    last_command: Option<CommandPlan>,
    last_result: Option<CommandResult>,
    executor: Box<dyn Executor>,
}

impl StateConnection {
    /// Construct new connection for local machine.
    pub fn local() -> Self {
        Self::with_executor(Target::Local, None, None, LocalShell::new())
    }

    /// Construct new connection to remote host.
    ///
    /// Verifies that the host is reachable by running a test command.
    ///
    /// # Errors
    ///
    /// - Return [`ConnectionError::Unreachable`] if test command fails.
    #[instrument(skip(host, user), level = "debug")]
    pub fn remote(host: impl Into<String>, user: impl Into<String>) -> Result<Self> {
        let host = host.into();
        let user = user.into();
        let session = SshSession::new(host.as_str(), user.as_str());
        let mut connection =
            Self::with_executor(Target::Remote, Some(host), Some(user), session);
        connection.verify()?;

        Ok(connection)
    }

    /// Construct new connection with custom executor.
    ///
    /// No test command is run.
    pub fn with_executor(
        target: Target,
        remote_host: Option<String>,
        remote_user: Option<String>,
        executor: impl Executor + 'static,
    ) -> Self {
        Self {
            target,
            remote_host,
            remote_user,
            working_dir: None,
            venv: None,
            env: BTreeMap::new(),
            last_command: None,
            last_result: None,
            executor: Box::new(executor),
        }
    }

    /// Run test command to check that remote host accepts our commands.
    ///
    /// # Errors
    ///
    /// - Return [`ConnectionError::Unreachable`] if test command fails.
    pub fn verify(&mut self) -> Result<()> {
        let options = RunOptions::new()
            .hide()
            .on_failure(OnFailure::Tolerate)
            .target_spec(TargetSpec::Both);
        let result = self.run(r#"echo "Connection successful!""#, options)?;
        if !result.success() {
            return Err(ConnectionError::Unreachable {
                destination: self.remote_destination().unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Fixed target of connection.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Remote host name if any.
    pub fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    /// Remote user name if any.
    pub fn remote_user(&self) -> Option<&str> {
        self.remote_user.as_deref()
    }

    /// Remote address as `user@host` if both parts are known.
    pub fn remote_destination(&self) -> Option<String> {
        match (&self.remote_user, &self.remote_host) {
            (Some(user), Some(host)) => Some(format!("{user}@{host}")),
            _ => None,
        }
    }

    /// Currently tracked working directory.
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    /// Last executed command plan.
    pub fn last_command(&self) -> Option<&CommandPlan> {
        self.last_command.as_ref()
    }

    /// Result of last executed command.
    pub fn last_result(&self) -> Option<&CommandResult> {
        self.last_result.as_ref()
    }

    /// Environment variables exported before every command.
    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Print text bright if target spec includes our target, else dimmed.
    pub fn cprint(&self, text: impl AsRef<str>, target_spec: TargetSpec) {
        if target_spec.includes(self.target) {
            println!("{}", bright(text));
        } else {
            let message = format!("Omit: (target_spec is not {}) ", self.target);
            println!("{}", dim(format!("{message}{}", text.as_ref())));
        }
    }

    /// Export environment variable for all subsequent commands.
    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.insert(name.into(), value.into());
    }

    /// Activate virtual environment for subsequent commands.
    ///
    /// Path to the activation script is not validated. Instead a test command
    /// is run through the environment to give early feedback.
    ///
    /// # Errors
    ///
    /// - Return [`ConnectionError`] if test command fails.
    pub fn activate_venv(
        &mut self,
        activate_script: impl Into<String>,
        scope: VenvScope,
    ) -> Result<CommandResult> {
        self.venv = Some(VirtualEnv {
            activate_script: activate_script.into(),
            scope,
        });

        let target_spec = match scope {
            VenvScope::Remote => TargetSpec::Remote,
            VenvScope::Both => TargetSpec::Both,
        };
        self.run(
            r#"python -c "import sys; print(sys.path)""#,
            RunOptions::new().target_spec(target_spec),
        )
    }

    /// Stop activating virtual environment.
    pub fn deactivate_venv(&mut self) {
        self.venv = None;
    }

    /// Change tracked working directory.
    ///
    /// Passing `None` clears the tracked directory. Paths not starting with
    /// `/`, `~`, or `$` are relative to the currently tracked directory.
    ///
    /// After the change `pwd` is run. If the last path segment it reports
    /// differs from the last segment of the requested path, the change is
    /// reverted and a failed result is returned. With `tolerate_error` set,
    /// or for paths starting with `~` or `$`, the new directory is kept and
    /// the `pwd` result is returned as is. Their last segment usually never
    /// shows up in the reported path.
    ///
    /// # Errors
    ///
    /// - Return [`ConnectionError::EmptyPath`] if path is empty.
    /// - Return [`ConnectionError::RelativeWithoutBase`] if path is relative
    ///   but no directory is tracked yet.
    #[instrument(skip(self), level = "debug")]
    pub fn chdir(
        &mut self,
        path: Option<&str>,
        target_spec: TargetSpec,
        tolerate_error: bool,
    ) -> Result<CommandResult> {
        let Some(path) = path else {
            self.working_dir = None;
            return Ok(CommandResult::default());
        };

        if path.is_empty() {
            return Err(ConnectionError::EmptyPath);
        }

        if !target_spec.includes(self.target) {
            println!("{}", omitted_notice(&format!("chdir `{path}`"), target_spec));
            return Ok(CommandResult::omitted());
        }

        let pwd_opts = RunOptions::new()
            .hide()
            .on_failure(OnFailure::Tolerate)
            .target_spec(target_spec);

        let is_lenient = path.starts_with('~') || path.starts_with('$');
        let new_dir = if path.starts_with('/') || is_lenient {
            path.to_string()
        } else {
            if self.working_dir.is_none() {
                return Err(ConnectionError::RelativeWithoutBase { path: path.into() });
            }

            let result = self.run("pwd", pwd_opts.clone())?;
            if !result.success() {
                warn!("{}", bred(format!("Could not determine current directory: {}", result.stderr)));
                return Ok(result);
            }
            format!("{}/{path}", result.stdout.trim())
        };

        let old_dir = self.working_dir.replace(new_dir);
        let result = self.run("pwd", pwd_opts)?;
        let pwd = result.stdout.trim();

        if !result.success() {
            let detail = result.extra.as_deref().unwrap_or(result.stderr.as_str());
            warn!("{}", bred(format!("Could not change directory. Error message: {detail}")));
            self.working_dir = old_dir;
            return Ok(result);
        }

        // INVARIANT: Only compare last path segment.
        //   - Symlinks and relative paths can make everything before it differ.
        //   - A failed `cd` still lets `pwd` print the previous directory, so
        //     partial segment matches do not count.
        let wanted = last_segment(path);
        let reported = last_segment(pwd);
        if reported != wanted {
            if is_lenient || tolerate_error {
                debug!("accept {path:?} although `pwd` reported {pwd:?}");
                return Ok(result);
            }

            warn!("{}", bred(format!("Could not change directory. `pwd`-result: {pwd}")));
            self.working_dir = old_dir;
            return Ok(CommandResult::failed(
                1,
                format!("`pwd` reported {pwd:?} instead of {path:?}"),
            ));
        }

        Ok(result)
    }

    /// Dispatch command to the target of this connection.
    ///
    /// # Errors
    ///
    /// - Return [`ConnectionError::CommandFailed`] on nonzero exit code in
    ///   [`OnFailure::Smart`] mode.
    /// - Return [`ConnectionError::Transport`] if command could not be handed
    ///   to a shell in [`OnFailure::Smart`] mode.
    #[instrument(skip(self, command, options), level = "debug")]
    pub fn run(
        &mut self,
        command: impl Into<ShellCommand>,
        options: RunOptions,
    ) -> Result<CommandResult> {
        let mut plan = CommandPlan::new(command);
        let mut local_dir = None;

        if options.use_working_dir {
            if let Some(dir) = &self.working_dir {
                match self.target {
                    Target::Remote => plan = plan.change_dir(dir.as_str()),
                    Target::Local => local_dir = Some(dir.clone()),
                }
            }
        }

        plan = plan.exports(&self.env);

        if options.use_venv {
            if let Some(venv) = &self.venv {
                if venv.applies_to(options.target_spec) {
                    plan = plan.source(venv.activate_script.as_str());
                }
            }
        }

        if !options.hide {
            println!("{} {}", dim("->"), plan.command());
        }

        if options.print_only {
            return Ok(CommandResult::default());
        }

        if !options.target_spec.includes(self.target) {
            let action = format!("command `{}`", plan.command());
            println!("{}", omitted_notice(&action, options.target_spec));
            return Ok(CommandResult::omitted());
        }

        let line = plan.to_shell_line();
        debug!("dispatch to {} target: {line}", self.target);
        self.last_command = Some(plan.clone());

        let raw = match self.executor.execute(&line, local_dir.as_deref()) {
            Ok(raw) => raw,
            Err(error @ TransportError::Authentication { .. }) => {
                warn!("{}", bred("Could not connect via ssh. Ensure that ssh-agent is activated."));
                warn!("{}", dim(SSH_AGENT_HINT));
                return Ok(CommandResult::failed(1, error.to_string()));
            }
            Err(error) => {
                if options.on_failure == OnFailure::Smart {
                    return Err(error.into());
                }

                warn!("{}", bred(format!("Could not run `{}`: {error}", plan.command())));
                return Ok(CommandResult::failed(1, error.to_string()));
            }
        };

        let result = CommandResult::new(raw.exit_code, raw.stdout, raw.stderr);
        if !options.hide && !result.stdout.is_empty() {
            println!("{} {}", dim("<-"), result.stdout.trim_end());
        }

        match options.on_failure {
            OnFailure::Smart => {
                self.last_result = Some(result.clone());
                if !result.success() {
                    return Err(ConnectionError::CommandFailed {
                        command: plan.command().to_string(),
                        exit_code: result.exit_code,
                        stderr: result.stderr,
                    });
                }
                Ok(result)
            }
            OnFailure::Tolerate => {
                self.last_result = Some(result.clone());
                Ok(result)
            }
            OnFailure::Suppress if result.success() => {
                self.last_result = Some(result.clone());
                Ok(result)
            }
            OnFailure::Suppress => Ok(CommandResult::failed(
                result.exit_code,
                format!("command `{}` exited with {}", plan.command(), result.exit_code),
            )),
        }
    }
}

/// Dimmed line telling that an action was skipped for this target.
pub(crate) fn omitted_notice(action: &str, target_spec: TargetSpec) -> String {
    dim(format!("> Omitting {action}\n> due to target_spec: {target_spec}."))
}

/// Last segment of path, ignoring trailing slashes.
fn last_segment(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

/// All possible error types for command dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Command exited with nonzero exit code.
    #[error(
        "The command `{command}` failed with code {exit_code}. This is its stderr:\n\n{stderr}\n\n\
         You can also investigate the last command and last result of the connection"
    )]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// Command could not be handed to a shell.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Remote host did not accept test command.
    #[error("could not connect via ssh to {destination:?}, ensure that ssh-agent is activated")]
    Unreachable { destination: String },

    /// Relative path given before any directory was tracked.
    #[error("relative path {path:?} cannot be the first path specification")]
    RelativeWithoutBase { path: String },

    /// Empty path given to chdir.
    #[error("cannot change into empty path")]
    EmptyPath,
}

/// Friendly result alias :3
pub type Result<T, E = ConnectionError> = std::result::Result<T, E>;
