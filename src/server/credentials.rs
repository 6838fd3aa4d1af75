//! Credential configuration endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

use super::AppState;
use super::error::ApiRouteError;
use crate::types::{UserHash, UserId};

/// Body of `PUT /api/v1/credentials`.
#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(alias = "userHash")]
    pub user_hash: String,
}

impl CredentialsBody {
    /// Trims both values and rejects empty ones.
    pub fn validate(self) -> Result<(UserId, UserHash), ApiRouteError> {
        let user_id = self.user_id.trim();
        let user_hash = self.user_hash.trim();
        if user_id.is_empty() {
            return Err(ApiRouteError::EmptyField("user_id"));
        }
        if user_hash.is_empty() {
            return Err(ApiRouteError::EmptyField("user_hash"));
        }
        Ok((UserId::new(user_id), UserHash::new(user_hash)))
    }
}

/// Stores the user ID and hash.
///
/// # Response
///
/// - 204 No Content: stored
/// - 400 Bad Request: invalid JSON or an empty value
/// - 500 Internal Server Error: store write failed
/// - 503 Service Unavailable: worker stopped
pub async fn credentials_handler(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiRouteError> {
    let body: CredentialsBody = serde_json::from_slice(&body)?;
    let (user_id, user_hash) = body.validate()?;

    info!(user_id = %user_id, "Updating credentials");
    app_state.worker().set_credentials(user_id, user_hash).await?;
    Ok(StatusCode::NO_CONTENT)
}
