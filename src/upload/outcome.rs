//! Terminal states of an upload run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Code;

/// Counts reported when a run drains its queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Codes the API accepted as new redemptions.
    pub redeemed: usize,
    /// Codes the API reported as already redeemed.
    pub duplicates: usize,
}

/// Why a run stopped before draining its queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// User ID or hash missing or empty.
    MissingCredentials,
    /// The play server could not be resolved.
    NoServer,
    /// The ledger could not be read or saved.
    Storage,
    /// Refreshing the instance ID returned no user data.
    UserDetailsUnavailable { code: Code },
    /// The API failed, or the instance ID was still stale after a refresh.
    SubmissionFailed { code: Code },
    /// The API rejected the credentials.
    InvalidParameters { code: Code },
}

impl AbortReason {
    /// The code left pending in storage for a later run, if any.
    ///
    /// Credential problems keep the in-flight code queued. A plain
    /// submission failure drops it from storage.
    pub fn requeued_code(&self) -> Option<&Code> {
        match self {
            AbortReason::UserDetailsUnavailable { code }
            | AbortReason::InvalidParameters { code } => Some(code),
            AbortReason::SubmissionFailed { .. }
            | AbortReason::MissingCredentials
            | AbortReason::NoServer
            | AbortReason::Storage => None,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::MissingCredentials => write!(f, "missing credentials"),
            AbortReason::NoServer => write!(f, "no server"),
            AbortReason::Storage => write!(f, "storage failure"),
            AbortReason::UserDetailsUnavailable { code } => {
                write!(f, "user details unavailable while submitting {}", code)
            }
            AbortReason::SubmissionFailed { code } => write!(f, "submission of {} failed", code),
            AbortReason::InvalidParameters { code } => {
                write!(f, "invalid parameters submitting {}", code)
            }
        }
    }
}

/// Result of [`super::UploadDriver::start_upload_process`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Another run held the gate; this trigger was dropped.
    AlreadyRunning,
    /// The queue snapshot was drained.
    Completed(RunSummary),
    /// The run stopped early.
    Aborted(AbortReason),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}
