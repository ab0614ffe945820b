// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Post-deployment smoke check over HTTP.

use crate::style::{bgreen, bred};

use std::{error::Error as StdError, thread::sleep, time::Duration};
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("deployutils/", env!("CARGO_PKG_VERSION"));
const TLS_MARKERS: [&str; 4] = ["certificate", "tls", "ssl", "handshake"];

/// Outcome of [`ensure_http_response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpCheck {
    /// Expected status code received.
    Expected,

    /// Secure connection cannot be established.
    TlsError,

    /// Response carries another status code.
    Unexpected(u16),
}

impl HttpCheck {
    /// Numeric code of outcome: 0 expected, 1 TLS error, 2 unexpected.
    pub fn code(&self) -> i32 {
        match self {
            Self::Expected => 0,
            Self::TlsError => 1,
            Self::Unexpected(_) => 2,
        }
    }
}

/// Send one GET request after optional delay, and report status.
///
/// Non-success status codes are reported, never raised.
///
/// # Errors
///
/// - Return [`HttpError`] if request fails for any reason but TLS.
#[instrument(skip(url), level = "debug")]
pub fn ensure_http_response(url: &str, expected_status: u16, delay: Duration) -> Result<HttpCheck> {
    if !delay.is_zero() {
        debug!("wait {delay:?} before request");
        sleep(delay);
    }

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = match client.get(url).send() {
        Ok(response) => response,
        Err(error) if is_tls_error(&error) => {
            println!("{}", bred(format!("{url}: There was a TLS error (see below)")));
            println!("{}", error_chain(&error));
            return Ok(HttpCheck::TlsError);
        }
        Err(error) => return Err(error.into()),
    };

    let status = response.status().as_u16();
    if status == expected_status {
        println!(
            "{}",
            bgreen(format!("{url}: expected status code received: {expected_status}."))
        );
        Ok(HttpCheck::Expected)
    } else {
        println!("{}", bred(format!("{url}: unexpected status code: {status}.")));
        Ok(HttpCheck::Unexpected(status))
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    error.is_connect() && mentions_tls(&error_chain(error))
}

fn mentions_tls(text: &str) -> bool {
    let text = text.to_lowercase();
    TLS_MARKERS.iter().any(|marker| text.contains(marker))
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain.join(": ")
}

/// All possible error types for HTTP checks.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Request fails.
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Friendly result alias :3
pub type Result<T, E = HttpError> = std::result::Result<T, E>;
