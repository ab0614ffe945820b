// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Interactive confirmation before destructive steps.

use crate::{
    connection::Target,
    style::{bred, bright, yellow},
};

use inquire::Confirm;
use tracing::{debug, instrument};

/// Summary of a deployment shown to the user before it proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentNotice<'a> {
    pub appname: &'a str,
    pub target: Target,
    pub deployment_path: &'a str,
    pub user: Option<&'a str>,
    pub host: Option<&'a str>,
}

impl DeploymentNotice<'_> {
    /// Caution banner printed before asking.
    pub fn banner(&self) -> String {
        let user_at_host = format!(
            "{}@{}",
            self.user.unwrap_or("None"),
            self.host.unwrap_or("None")
        );

        format!(
            "\n  You are running the deployment for {} with target {} → {},\n\
             \n  deploymentpath: `{}`.\n\
             \n  {} All existing user data of the app and any other changes in the\n  \
             deployment directory will probably be replaced by predefined data and fixtures.\n",
            bright(self.appname),
            bright(self.target.to_string()),
            bright(user_at_host),
            self.deployment_path,
            yellow("Caution:"),
        )
    }
}

/// Print caution banner and ask whether deployment should continue.
///
/// With `unsafe_flag` set the question is skipped and the deployment proceeds.
/// Declining prints "Aborted." and returns `false`, leaving it to the caller to
/// stop.
///
/// # Errors
///
/// - Return [`PromptError`] if user cannot be asked.
#[instrument(skip(notice), level = "debug")]
pub fn confirm_deployment(notice: &DeploymentNotice<'_>, unsafe_flag: bool) -> Result<bool> {
    println!("{}", notice.banner());
    if unsafe_flag {
        debug!("security confirmation omitted");
        return Ok(true);
    }

    let proceed = ask("Continue?")?;
    if !proceed {
        println!("{}", bred("Aborted."));
    }

    Ok(proceed)
}

/// Ask yes or no question, defaulting to no.
///
/// # Errors
///
/// - Return [`PromptError`] if prompt fails or gets canceled.
pub fn ask(question: &str) -> Result<bool> {
    Ok(Confirm::new(question).with_default(false).prompt()?)
}

/// All possible error types for interactive prompts.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Prompt fails or user cancels it.
    #[error(transparent)]
    Inquire(#[from] inquire::InquireError),
}

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_names_deployment() {
        let notice = DeploymentNotice {
            appname: "shop",
            target: Target::Remote,
            deployment_path: "~/shop_deployment",
            user: Some("deploy"),
            host: Some("example.org"),
        };

        let banner = notice.banner();
        assert!(banner.contains("deploy@example.org"));
        assert!(banner.contains("deploymentpath: `~/shop_deployment`."));
        assert!(banner.contains("All existing user data"));
    }

    #[test]
    fn unsafe_flag_skips_question() -> anyhow::Result<()> {
        let notice = DeploymentNotice {
            appname: "shop",
            target: Target::Local,
            deployment_path: "/tmp/shop",
            user: None,
            host: None,
        };
        assert!(confirm_deployment(&notice, true)?);
        Ok(())
    }
}
