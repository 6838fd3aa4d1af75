//! Remote redemption API.
//!
//! The upload driver talks to the game's servers through two traits:
//!
//! - [`ServerResolver`]: which play server to talk to
//! - [`RedemptionApi`]: submitting codes and refreshing the instance ID
//!
//! Neither returns an error type. Transport and protocol failures are folded
//! into the results the driver acts on ([`SubmissionOutcome::Failed`], `None`),
//! after being logged by the implementation.
//!
//! [`HttpApiClient`] implements both against the real HTTP endpoints.

pub mod client;
pub mod error;
pub mod response;

pub use client::{DEFAULT_MASTER_SERVER, HttpApiClient};
pub use error::ApiError;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::types::{Code, InstanceId, ServerUrl, SubmissionOutcome, UserHash, UserId};

/// Parameters for submitting one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub server: ServerUrl,
    pub user_id: UserId,
    pub hash: UserHash,
    pub instance_id: Option<InstanceId>,
    pub code: Code,
}

/// Parameters for fetching the account's current details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetailsRequest {
    pub server: ServerUrl,
    pub user_id: UserId,
    pub hash: UserHash,
}

/// The subset of account details the redeemer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub instance_id: InstanceId,
}

/// Finds the play server to submit codes to.
pub trait ServerResolver: Send + Sync + 'static {
    /// Returns the server, or `None` if it could not be determined.
    fn resolve_server(&self) -> impl Future<Output = Option<ServerUrl>> + Send;
}

/// Submits codes and fetches account details.
pub trait RedemptionApi: Send + Sync + 'static {
    /// Submits one code and classifies the response.
    fn submit_code(
        &self,
        request: &SubmitRequest,
    ) -> impl Future<Output = SubmissionOutcome> + Send;

    /// Fetches account details, or `None` if the request failed.
    fn user_details(
        &self,
        request: &UserDetailsRequest,
    ) -> impl Future<Output = Option<UserDetails>> + Send;
}
