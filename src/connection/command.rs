// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Shell command composition.
//!
//! A dispatched command is never sent alone. Depending on the state of the
//! connection it gets prefixed with a virtual environment activation, a set of
//! environment variable exports, and a change of directory. Instead of gluing
//! strings together at the call site, a [`CommandPlan`] keeps each of these
//! prefixes as its own structured step, and renders them in a fixed order:
//!
//! ```text
//! source <venv>; export A="1"; export B="2"; cd <dir>; <command>
//! ```
//!
//! All quoting rules live in this module.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Command handed to a connection.
///
/// Either a literal shell line, which is passed through untouched, or a
/// pre-tokenized argument list whose arguments get quoted individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Literal shell line.
    Line(String),

    /// Pre-tokenized argument list.
    Argv(Vec<String>),
}

impl ShellCommand {
    /// Render command as a single shell line.
    pub fn to_shell_line(&self) -> String {
        match self {
            Self::Line(line) => line.clone(),
            Self::Argv(args) => shell_words::join(args),
        }
    }
}

impl From<&str> for ShellCommand {
    fn from(line: &str) -> Self {
        Self::Line(line.to_owned())
    }
}

impl From<String> for ShellCommand {
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

impl From<&String> for ShellCommand {
    fn from(line: &String) -> Self {
        Self::Line(line.clone())
    }
}

impl From<Vec<String>> for ShellCommand {
    fn from(args: Vec<String>) -> Self {
        Self::Argv(args)
    }
}

impl From<Vec<&str>> for ShellCommand {
    fn from(args: Vec<&str>) -> Self {
        Self::Argv(args.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ShellCommand {
    fn from(args: [&str; N]) -> Self {
        Self::Argv(args.into_iter().map(str::to_owned).collect())
    }
}

impl Display for ShellCommand {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.to_shell_line().as_str())
    }
}

/// Structured composition of a command with its prefix steps.
///
/// # Invariant
///
/// - Steps always render as: activation, exports sorted by name, change of
///   directory, command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    venv: Option<String>,
    exports: BTreeMap<String, String>,
    working_dir: Option<String>,
    command: String,
}

impl CommandPlan {
    /// Construct new plan for a command without any prefix steps.
    pub fn new(command: impl Into<ShellCommand>) -> Self {
        Self {
            command: command.into().to_shell_line(),
            ..Default::default()
        }
    }

    /// Activate virtual environment through its activation script.
    pub fn source(mut self, activate_script: impl Into<String>) -> Self {
        self.venv = Some(activate_script.into());
        self
    }

    /// Export environment variables before running the command.
    pub fn exports<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.exports
            .extend(vars.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    /// Change directory before running the command.
    ///
    /// The directory is not quoted so `~` and `$VAR` forms still get expanded
    /// by the shell that receives the plan.
    pub fn change_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The command itself, without any prefix steps.
    pub fn command(&self) -> &str {
        self.command.as_str()
    }

    /// Render each step as its own shell statement.
    pub fn steps(&self) -> Vec<String> {
        let mut steps = Vec::new();
        if let Some(venv) = &self.venv {
            steps.push(format!("source {venv}"));
        }

        for (name, value) in &self.exports {
            steps.push(format!("export {name}={}", double_quote(value)));
        }

        if let Some(dir) = &self.working_dir {
            steps.push(format!("cd {dir}"));
        }

        steps.push(self.command.clone());
        steps
    }

    /// Render entire plan as one shell line.
    pub fn to_shell_line(&self) -> String {
        self.steps().join("; ")
    }
}

impl Display for CommandPlan {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.to_shell_line().as_str())
    }
}

/// Wrap value in double quotes.
///
/// Variable references stay live, everything else is taken literally.
fn double_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '`') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case(ShellCommand::from("ls -la ~/tmp"), "ls -la ~/tmp"; "literal line untouched")]
    #[test_case(ShellCommand::from(["echo", "hello world"]), "echo 'hello world'"; "argv quoted")]
    #[test_case(ShellCommand::from(vec!["rm", "-rf", "a b", "c"]), "rm -rf 'a b' c"; "argv mixed")]
    #[test]
    fn shell_command_renders_line(command: ShellCommand, expect: &str) {
        pretty_assertions::assert_eq!(command.to_shell_line(), expect);
    }

    #[test]
    fn plan_without_prefix_is_plain_command() {
        let plan = CommandPlan::new("hostname");
        assert_eq!(plan.to_shell_line(), "hostname");
        assert_eq!(plan.steps(), vec!["hostname".to_string()]);
    }

    #[test]
    fn plan_renders_steps_in_fixed_order() {
        // Builder call order must not matter.
        let plan = CommandPlan::new("python --version")
            .change_dir("~/tmp")
            .exports([("ZETA", "2"), ("ALPHA", "1")])
            .source("~/venv/bin/activate");

        assert_eq!(
            plan.to_shell_line(),
            r#"source ~/venv/bin/activate; export ALPHA="1"; export ZETA="2"; cd ~/tmp; python --version"#
        );
        assert_eq!(plan.command(), "python --version");
    }

    #[test_case("plain", r#""plain""#; "plain")]
    #[test_case("with space", r#""with space""#; "space")]
    #[test_case(r#"say "hi""#, r#""say \"hi\"""#; "inner quotes")]
    #[test_case(r"back\slash", r#""back\\slash""#; "backslash")]
    #[test_case("$HOME/x", r#""$HOME/x""#; "variable stays live")]
    #[test_case("`id`", r#""\`id\`""#; "backticks escaped")]
    #[test]
    fn export_values_are_double_quoted(value: &str, expect: &str) {
        pretty_assertions::assert_eq!(double_quote(value), expect);
    }
}
