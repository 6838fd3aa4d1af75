//! Read-only endpoints for observability.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::AppState;
use super::error::ApiRouteError;
use crate::status::StatusEntry;
use crate::worker::LedgerView;

/// Liveness probe. Always 200 "OK" while the server runs.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Returns the stored ledger and whether credentials are configured.
///
/// Goes through the worker so the view reflects every detection accepted
/// before this request.
pub async fn ledger_handler(
    State(app_state): State<AppState>,
) -> Result<Json<LedgerView>, ApiRouteError> {
    let view = app_state.worker().inspect_ledger().await?;
    Ok(Json(view))
}

/// Returns the retained status messages, oldest first.
pub async fn status_handler(State(app_state): State<AppState>) -> Json<Vec<StatusEntry>> {
    Json(app_state.status().recent())
}
