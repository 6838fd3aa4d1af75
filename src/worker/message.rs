//! Worker message types for async communication.
//!
//! The HTTP layer sends these to the intake worker over an mpsc channel.
//! Requests that need an answer carry a `oneshot` reply sender.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::persistence::{Settings, StoreError};
use crate::types::{Code, InstanceId, UserHash, UserId};

/// What a detection message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    /// Candidate codes extracted by the detector.
    Codes,
    /// Anything else; ignored by the worker.
    #[serde(other)]
    Other,
}

/// A message from the external code detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionMessage {
    #[serde(alias = "messageType")]
    pub message_type: DetectionKind,

    /// Raw candidate strings, untrimmed.
    #[serde(default)]
    pub codes: Vec<String>,
}

impl DetectionMessage {
    pub fn codes(codes: Vec<String>) -> Self {
        DetectionMessage {
            message_type: DetectionKind::Codes,
            codes,
        }
    }
}

/// Read-only view of the stored ledger and session context.
///
/// The user hash is never exposed; only whether usable credentials exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerView {
    pub redeemed: Vec<Code>,
    pub pending: Vec<Code>,
    pub instance_id: Option<InstanceId>,
    pub has_credentials: bool,
}

impl From<&Settings> for LedgerView {
    fn from(settings: &Settings) -> Self {
        let ledger = settings.ledger();
        LedgerView {
            redeemed: ledger.redeemed,
            pending: ledger.pending,
            instance_id: settings.instance_id.clone(),
            has_credentials: settings.credentials().is_some(),
        }
    }
}

/// Messages that can be sent to the intake worker.
///
/// The worker processes these serially, so intake merges never interleave
/// with each other. Upload runs are spawned and do not block the loop.
#[derive(Debug)]
pub enum WorkerMessage {
    /// A detection message to merge into the pending queue.
    Detected(DetectionMessage),

    /// Trigger an upload run regardless of intake.
    ///
    /// Dropped by the driver if a run is already active.
    StartUpload,

    /// Store new user credentials.
    SetCredentials {
        user_id: UserId,
        user_hash: UserHash,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },

    /// Read the stored ledger.
    InspectLedger(oneshot::Sender<Result<LedgerView, StoreError>>),

    /// Request a graceful shutdown.
    ///
    /// The worker stops taking messages. A run already in flight keeps going
    /// on its own task.
    Shutdown,
}
