//! The persisted key/value record and the store contract.

use std::future::Future;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::Ledger;
use crate::types::{Code, InstanceId, UserHash, UserId};

/// Errors that can occur while reading or writing settings.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema version mismatch.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// The store's internal lock was poisoned by a panicking writer.
    #[error("settings store lock poisoned")]
    Poisoned,
}

/// Every persisted key. `None` means the key has never been written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeemed_codes: Option<Vec<Code>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_codes: Option<Vec<Code>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_hash: Option<UserHash>,
}

impl Settings {
    /// Returns the ledger, treating absent lists as empty.
    pub fn ledger(&self) -> Ledger {
        Ledger::from_parts(self.redeemed_codes.clone(), self.pending_codes.clone())
    }

    /// Writes both ledger lists.
    pub fn set_ledger(&mut self, ledger: Ledger) {
        self.redeemed_codes = Some(ledger.redeemed);
        self.pending_codes = Some(ledger.pending);
    }

    /// Returns the credentials if both are present and non-empty.
    pub fn credentials(&self) -> Option<(&UserId, &UserHash)> {
        match (&self.user_id, &self.user_hash) {
            (Some(id), Some(hash)) if !id.is_empty() && !hash.is_empty() => Some((id, hash)),
            _ => None,
        }
    }
}

/// Durable key/value storage for [`Settings`].
///
/// `update` is an atomic read-modify-write: the closure sees the current
/// record and returns whether it changed anything. Nothing is written when it
/// returns `false`. Concurrent updates are serialized by the store, so two
/// writers never overwrite each other's changes.
pub trait SettingsStore: Send + Sync + 'static {
    /// Reads every key in one batch.
    fn load(&self) -> impl Future<Output = Result<Settings, StoreError>> + Send;

    /// Applies `f` to the current record and persists the result if `f`
    /// returns true. Returns the record as it stands afterwards.
    fn update<F>(&self, f: F) -> impl Future<Output = Result<Settings, StoreError>> + Send
    where
        F: FnOnce(&mut Settings) -> bool + Send;
}
