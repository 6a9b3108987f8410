use std::fmt::{Display, Formatter};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::http_client::HttpError;

/// Login handshake failures. Always fatal for the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("login page request failed: {0}")]
    Transport(String),
    #[error("login page returned status {status}")]
    LoginPageStatus { status: u16 },
    #[error("login page has no form")]
    MissingForm,
    #[error("login form has no hidden anti-forgery input")]
    MissingCsrfToken,
    #[error("portal rejected credentials with status {status}")]
    Rejected { status: u16 },
}

/// A feed name outside the known catalogue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown feed identifier '{value}'")]
pub struct UnknownFeedError {
    pub value: String,
}

impl UnknownFeedError {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Classification of a failed artifact fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Network-level failure before a status was received.
    Transport,
    /// The portal answered with a non-success status.
    Status(u16),
    /// The body could not be read as `;`-delimited rows.
    Decode,
    /// The run was asked to stop while the request was in flight.
    Cancelled,
}

/// One cursor tick whose artifact could not be fetched or read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    kind: FetchErrorKind,
    path: String,
    cursor: Option<NaiveDateTime>,
    message: String,
    retryable: bool,
}

impl FetchError {
    pub fn transport(path: impl Into<String>, error: &HttpError) -> Self {
        Self {
            kind: FetchErrorKind::Transport,
            path: path.into(),
            cursor: None,
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }

    /// Statuses that a later attempt may plausibly clear.
    pub fn status(path: impl Into<String>, status: u16) -> Self {
        Self {
            kind: FetchErrorKind::Status(status),
            path: path.into(),
            cursor: None,
            message: format!("portal returned status {status}"),
            retryable: matches!(status, 408 | 429) || status >= 500,
        }
    }

    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Decode,
            path: path.into(),
            cursor: None,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn cancelled(path: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Cancelled,
            path: path.into(),
            cursor: None,
            message: String::from("run cancelled"),
            retryable: false,
        }
    }

    pub fn at_cursor(mut self, cursor: NaiveDateTime) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub const fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn cursor(&self) -> Option<NaiveDateTime> {
        self.cursor
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "fetch of '{}' failed: {}", self.path, self.message)
    }
}

impl std::error::Error for FetchError {}

/// A required column whose raw text does not cast to its declared type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{table}.{column}: cannot read {raw:?} as {expected}")]
pub struct MalformedRowError {
    pub table: &'static str,
    pub column: &'static str,
    pub raw: Option<String>,
    pub expected: &'static str,
    /// The raw row rendered as `name=value` pairs for the log.
    pub row: String,
}

/// Configuration problems detected before anything touches the network.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be provided")]
    Missing { field: &'static str },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("session open {open} must not be after session close {close}")]
    InvertedSession { open: String, close: String },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Top-level error for extraction runs.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    UnknownFeed(#[from] UnknownFeedError),

    #[error("http client setup failed: {0}")]
    Http(#[from] HttpError),

    #[error("feed task for '{feed}' failed: {message}")]
    Task { feed: &'static str, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        assert!(FetchError::status("p", 500).retryable());
        assert!(FetchError::status("p", 503).retryable());
        assert!(FetchError::status("p", 429).retryable());
        assert!(FetchError::status("p", 408).retryable());
        assert!(!FetchError::status("p", 404).retryable());
        assert!(!FetchError::status("p", 403).retryable());
        assert!(!FetchError::decode("p", "bad").retryable());
    }

    #[test]
    fn transport_errors_inherit_http_retryability() {
        let timeout = FetchError::transport("p", &HttpError::new("timeout"));
        let invalid = FetchError::transport("p", &HttpError::non_retryable("bad url"));

        assert!(timeout.retryable());
        assert!(!invalid.retryable());
        assert_eq!(timeout.kind(), FetchErrorKind::Transport);
    }
}
