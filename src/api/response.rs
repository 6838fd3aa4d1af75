//! Response bodies returned by the play and master servers.
//!
//! Only the fields the redeemer reads are modeled; everything else in the
//! (large) responses is ignored.

use serde::Deserialize;

use super::UserDetails;
use super::error::ApiError;
use crate::types::{InstanceId, ServerUrl, SubmissionOutcome};

/// `failure_reason` for a stale instance ID.
pub const REASON_OUTDATED_INSTANCE_ID: &str = "Outdated instance id";

/// `failure_reason` for a code this account already redeemed.
pub const REASON_ALREADY_REDEEMED: &str = "You have already redeemed this combination.";

/// `failure_reason` for a bad user ID / hash pair.
pub const REASON_INVALID_PARAMETERS: &str = "Invalid or incomplete parameters";

/// Body of `call=getPlayServerForDefinitions`.
#[derive(Debug, Deserialize)]
pub struct PlayServerResponse {
    pub play_server: Option<String>,
}

/// Body of `call=redeemcoupon`.
#[derive(Debug, Deserialize)]
pub struct RedeemResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Body of `call=getuserdetails`.
#[derive(Debug, Deserialize)]
pub struct UserDetailsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub details: Option<RawUserDetails>,
}

#[derive(Debug, Deserialize)]
pub struct RawUserDetails {
    /// Sent as a number by some servers and a string by others.
    #[serde(default)]
    pub instance_id: serde_json::Value,
}

impl RedeemResponse {
    /// Maps the response onto a [`SubmissionOutcome`].
    ///
    /// Unrecognized failure reasons, and `success: false` without a reason,
    /// are [`SubmissionOutcome::Failed`].
    pub fn outcome(&self) -> SubmissionOutcome {
        match self.failure_reason.as_deref() {
            Some(REASON_OUTDATED_INSTANCE_ID) => SubmissionOutcome::OutdatedInstanceId,
            Some(REASON_ALREADY_REDEEMED) => SubmissionOutcome::AlreadyRedeemed,
            Some(REASON_INVALID_PARAMETERS) => SubmissionOutcome::InvalidParameters,
            Some(_) => SubmissionOutcome::Failed,
            None if self.success => SubmissionOutcome::Success,
            None => SubmissionOutcome::Failed,
        }
    }
}

impl PlayServerResponse {
    pub fn into_server(self) -> Result<ServerUrl, ApiError> {
        match self.play_server {
            Some(url) if !url.is_empty() => Ok(ServerUrl::new(url)),
            _ => Err(ApiError::Rejected("no play_server in response".into())),
        }
    }
}

impl UserDetailsResponse {
    pub fn into_details(self) -> Result<UserDetails, ApiError> {
        if !self.success {
            let reason = self
                .failure_reason
                .unwrap_or_else(|| "success was false".to_string());
            return Err(ApiError::Rejected(reason));
        }

        let raw = self
            .details
            .ok_or_else(|| ApiError::Rejected("no details in response".into()))?;

        let instance_id = match raw.instance_id {
            serde_json::Value::String(s) if !s.is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(ApiError::Rejected(format!(
                    "unusable instance_id: {}",
                    other
                )));
            }
        };

        Ok(UserDetails {
            instance_id: InstanceId::new(instance_id),
        })
    }
}
