//! Redemption API error types.
//!
//! These stay inside [`super::client`]: the trait boundary converts them into
//! [`crate::types::SubmissionOutcome::Failed`] or `None` after logging.

use thiserror::Error;

/// A failed call to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be built, sent, or its body read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server URL could not be joined with the endpoint path.
    #[error("invalid server URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The body was not the JSON shape we expected.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered but reported `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    /// Returns the HTTP status code, if the failure carried one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status(code) => Some(*code),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            ApiError::InvalidUrl { .. } | ApiError::Decode(_) | ApiError::Rejected(_) => None,
        }
    }
}
