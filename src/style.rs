// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Terminal styling for status output.
//!
//! Thin wrappers that decorate text with ANSI escape codes. Whether color is
//! actually emitted follows the usual `NO_COLOR`/`CLICOLOR` conventions honored
//! by [`colored`].

use colored::Colorize;

/// Gray text for secondary information, e.g., echoed commands.
pub fn dim(text: impl AsRef<str>) -> String {
    text.as_ref().bright_black().to_string()
}

/// Bold text for primary information.
pub fn bright(text: impl AsRef<str>) -> String {
    text.as_ref().bold().to_string()
}

/// Bold green text for success messages.
pub fn bgreen(text: impl AsRef<str>) -> String {
    text.as_ref().green().bold().to_string()
}

/// Bold red text for failure messages.
pub fn bred(text: impl AsRef<str>) -> String {
    text.as_ref().red().bold().to_string()
}

/// Yellow text for warnings.
pub fn yellow(text: impl AsRef<str>) -> String {
    text.as_ref().yellow().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case(|text| dim(text), "\u{1b}[90mblah\u{1b}[0m"; "dim style")]
    #[test_case(|text| bright(text), "\u{1b}[1mblah\u{1b}[0m"; "bright style")]
    #[test_case(|text| bgreen(text), "\u{1b}[1;32mblah\u{1b}[0m"; "bold green style")]
    #[test_case(|text| bred(text), "\u{1b}[1;31mblah\u{1b}[0m"; "bold red style")]
    #[test_case(|text| yellow(text), "\u{1b}[33mblah\u{1b}[0m"; "yellow style")]
    #[test]
    fn style_wraps_text_in_escape_codes(style: fn(&str) -> String, expect: &str) {
        colored::control::set_override(true);
        pretty_assertions::assert_eq!(style("blah"), expect);
    }
}
