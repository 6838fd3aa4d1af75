//! HTTP server for the code redeemer.
//!
//! This module implements the HTTP server that:
//! - Accepts detection messages from the external code detector
//! - Lets an operator store credentials and trigger an upload by hand
//! - Provides ledger and status inspection endpoints for observability
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /api/v1/detections` - Forwards a detection message (returns 202 Accepted)
//! - `POST /api/v1/upload` - Triggers an upload run (returns 202 Accepted)
//! - `PUT /api/v1/credentials` - Stores user ID and hash (returns 204 No Content)
//! - `GET /api/v1/ledger` - Returns the stored ledger as JSON
//! - `GET /api/v1/status` - Returns recent status messages as JSON
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

pub mod credentials;
pub mod error;
pub mod inspect;
pub mod intake;

pub use credentials::credentials_handler;
pub use error::ApiRouteError;
pub use inspect::{health_handler, ledger_handler, status_handler};
pub use intake::{detections_handler, upload_handler};

use crate::status::StatusLog;
use crate::worker::WorkerHandle;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Sender for the intake worker.
    worker: WorkerHandle,

    /// Status history shared with the worker and upload driver.
    status: StatusLog,
}

impl AppState {
    pub fn new(worker: WorkerHandle, status: StatusLog) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { worker, status }),
        }
    }

    pub fn worker(&self) -> &WorkerHandle {
        &self.inner.worker
    }

    pub fn status(&self) -> &StatusLog {
        &self.inner.status
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post, put};

    axum::Router::new()
        .route("/api/v1/detections", post(detections_handler))
        .route("/api/v1/upload", post(upload_handler))
        .route("/api/v1/credentials", put(credentials_handler))
        .route("/api/v1/ledger", get(ledger_handler))
        .route("/api/v1/status", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
