//! Detection and upload-trigger endpoints.
//!
//! Both hand work to the intake worker and return 202 Accepted without
//! waiting for it. Processing results show up on the status channel.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{debug, info};

use super::AppState;
use super::error::ApiRouteError;
use crate::worker::DetectionMessage;

/// Detection handler.
///
/// # Request
///
/// - Method: POST
/// - Body: `{"message_type": "codes", "codes": ["..."]}`
///
/// # Response
///
/// - 202 Accepted: forwarded to the worker
/// - 400 Bad Request: invalid JSON
/// - 503 Service Unavailable: worker stopped
pub async fn detections_handler(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiRouteError> {
    let detection: DetectionMessage = serde_json::from_slice(&body)?;
    debug!(
        kind = ?detection.message_type,
        candidates = detection.codes.len(),
        "Received detection"
    );

    app_state.worker().detected(detection).await?;
    Ok((StatusCode::ACCEPTED, "Accepted"))
}

/// Manual upload trigger.
///
/// Returns 202 even if a run is already active; the driver drops the trigger.
pub async fn upload_handler(
    State(app_state): State<AppState>,
) -> Result<(StatusCode, &'static str), ApiRouteError> {
    info!("Upload requested over HTTP");
    app_state.worker().start_upload().await?;
    Ok((StatusCode::ACCEPTED, "Accepted"))
}
