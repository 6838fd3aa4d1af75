//! Errors returned by HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::persistence::StoreError;
use crate::worker::WorkerError;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum ApiRouteError {
    /// The request body is not valid JSON for the endpoint.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required field was empty after trimming.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// The intake worker has stopped.
    #[error("worker unavailable")]
    Unavailable,

    /// The settings store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<WorkerError> for ApiRouteError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::ChannelClosed => ApiRouteError::Unavailable,
            WorkerError::Store(e) => ApiRouteError::Store(e),
        }
    }
}

impl IntoResponse for ApiRouteError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiRouteError::InvalidJson(_) | ApiRouteError::EmptyField(_) => StatusCode::BAD_REQUEST,
            ApiRouteError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiRouteError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
