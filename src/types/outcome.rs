//! Result of a single code submission.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the redemption API said about one submitted code.
///
/// The upload driver matches on this exhaustively, so adding a variant forces
/// every transition to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// The code was redeemed for this account.
    Success,

    /// The account had already redeemed this code. Not an error.
    AlreadyRedeemed,

    /// The instance identifier is stale; refresh it and resubmit.
    OutdatedInstanceId,

    /// The API rejected the user ID / hash pair.
    InvalidParameters,

    /// Anything else: transport errors, HTTP errors, unknown failure reasons.
    Failed,
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmissionOutcome::Success => "success",
            SubmissionOutcome::AlreadyRedeemed => "already redeemed",
            SubmissionOutcome::OutdatedInstanceId => "outdated instance id",
            SubmissionOutcome::InvalidParameters => "invalid parameters",
            SubmissionOutcome::Failed => "failed",
        };
        f.write_str(s)
    }
}
