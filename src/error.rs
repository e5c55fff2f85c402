//! Error types for the fatal failure classes.
//!
//! Per-resource problems (a rejected snapshot request, an action that never
//! settles, a price missing from the catalog) are not errors: they are carried
//! as values in the outcome records and the cost breakdown.

use thiserror::Error;

/// Failures that abort a run.
#[derive(Error, Debug)]
pub enum Error {
    /// Raised before any network call is made.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: FetchError,
    },
}

impl Error {
    pub fn fetch(what: impl Into<String>, source: FetchError) -> Self {
        Self::Fetch {
            what: what.into(),
            source,
        }
    }
}

/// Why a single API read failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
