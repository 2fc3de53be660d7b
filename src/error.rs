//! Error types for attach-downloader

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No valid credential could be obtained. Fatal to the run.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A configuration value is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single mailbox API call failed.
    #[error(
        "Remote error ({}): {message}",
        if *.transient { "transient" } else { "permanent" }
    )]
    Remote { transient: bool, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Remote {
            transient: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Remote {
            transient: false,
            message: message.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Remote { transient: true, .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            Self::transient(e.to_string())
        } else {
            Self::permanent(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
