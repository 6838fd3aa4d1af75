//! HTTP client for the Idle Champions web API.
//!
//! Every call is a GET to `<server>post.php?call=<name>&...`. The master
//! server tells us which play server to use; codes and user details go to
//! the play server.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::error::ApiError;
use super::response::{PlayServerResponse, RedeemResponse, UserDetailsResponse};
use super::{RedemptionApi, ServerResolver, SubmitRequest, UserDetails, UserDetailsRequest};
use crate::types::{ServerUrl, SubmissionOutcome};

/// Master server used to look up the current play server.
pub const DEFAULT_MASTER_SERVER: &str = "https://master.idlechampions.com/~idledragons/";

/// Client version the API expects; high enough to never be rejected as outdated.
const MOBILE_CLIENT_VERSION: &str = "999";

/// Network ID for the web/Steam client.
const NETWORK_ID: &str = "11";

const LANGUAGE_ID: &str = "1";

/// Talks to the master and play servers over HTTP.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    master_server: String,
}

impl HttpApiClient {
    /// Creates a client with the given per-request timeout.
    pub fn new(master_server: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::from_client(client, master_server))
    }

    /// Wraps a pre-configured reqwest client.
    pub fn from_client(client: Client, master_server: impl Into<String>) -> Self {
        HttpApiClient {
            client,
            master_server: master_server.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn fetch_play_server(&self) -> Result<ServerUrl, ApiError> {
        let url = endpoint(
            &self.master_server,
            "getPlayServerForDefinitions",
            &[("mobile_client_version", MOBILE_CLIENT_VERSION)],
        )?;
        let body: PlayServerResponse = self.get_json(url).await?;
        body.into_server()
    }

    async fn redeem(&self, request: &SubmitRequest) -> Result<SubmissionOutcome, ApiError> {
        let instance_id = request
            .instance_id
            .as_ref()
            .map(|id| id.as_str())
            .unwrap_or("0");
        let url = endpoint(
            request.server.as_str(),
            "redeemcoupon",
            &[
                ("language_id", LANGUAGE_ID),
                ("user_id", request.user_id.as_str()),
                ("hash", request.hash.as_str()),
                ("code", request.code.as_str()),
                ("timestamp", "0"),
                ("request_id", "0"),
                ("network_id", NETWORK_ID),
                ("mobile_client_version", MOBILE_CLIENT_VERSION),
                ("instance_id", instance_id),
            ],
        )?;
        let body: RedeemResponse = self.get_json(url).await?;
        debug!(failure_reason = ?body.failure_reason, success = body.success, "Redeem response");
        Ok(body.outcome())
    }

    async fn fetch_user_details(
        &self,
        request: &UserDetailsRequest,
    ) -> Result<UserDetails, ApiError> {
        let url = endpoint(
            request.server.as_str(),
            "getuserdetails",
            &[
                ("language_id", LANGUAGE_ID),
                ("user_id", request.user_id.as_str()),
                ("hash", request.hash.as_str()),
                ("instance_id", "0"),
                ("include_free_play_objectives", "true"),
                ("timestamp", "0"),
                ("request_id", "0"),
                ("network_id", NETWORK_ID),
                ("mobile_client_version", MOBILE_CLIENT_VERSION),
            ],
        )?;
        let body: UserDetailsResponse = self.get_json(url).await?;
        body.into_details()
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("master_server", &self.master_server)
            .finish_non_exhaustive()
    }
}

impl ServerResolver for HttpApiClient {
    #[instrument(skip(self), fields(master = %self.master_server))]
    async fn resolve_server(&self) -> Option<ServerUrl> {
        match self.fetch_play_server().await {
            Ok(server) => Some(server),
            Err(e) => {
                warn!(error = %e, "Failed to resolve play server");
                None
            }
        }
    }
}

impl RedemptionApi for HttpApiClient {
    #[instrument(skip(self, request), fields(code = %request.code, server = %request.server))]
    async fn submit_code(&self, request: &SubmitRequest) -> SubmissionOutcome {
        match self.redeem(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, status = ?e.status_code(), "Code submission failed");
                SubmissionOutcome::Failed
            }
        }
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id, server = %request.server))]
    async fn user_details(&self, request: &UserDetailsRequest) -> Option<UserDetails> {
        match self.fetch_user_details(request).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(error = %e, status = ?e.status_code(), "Failed to fetch user details");
                None
            }
        }
    }
}

/// Builds `<base>post.php?call=<call>&<params>`.
///
/// A missing trailing slash on `base` is added so the last path segment
/// (e.g. `~idledragons`) is kept when joining.
pub fn endpoint(base: &str, call: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
    let invalid = |source: url::ParseError| ApiError::InvalidUrl {
        url: base.to_string(),
        source,
    };

    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    let mut url = Url::parse(&normalized)
        .and_then(|u| u.join("post.php"))
        .map_err(invalid)?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("call", call);
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }

    Ok(url)
}
