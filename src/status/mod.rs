//! Fire-and-forget status reporting.
//!
//! The upload driver and intake worker describe their progress with
//! [`StatusMessage`]s pushed into a [`StatusSink`]. Sinks never fail and never
//! block: a lost status message is acceptable, a stalled upload is not.
//!
//! - [`format`]: the user-facing texts
//! - [`log`]: a bounded in-memory history served over HTTP

pub mod format;
pub mod log;

pub use log::{StatusEntry, StatusLog};

use serde::{Deserialize, Serialize};

use crate::types::Code;

/// A status update for whoever is watching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum StatusMessage {
    /// Progress information.
    Info(String),

    /// A run aborted.
    Error(String),

    /// A run completed.
    Success(String),

    /// A run could not start because the user ID or hash is missing.
    MissingCredentials,

    /// Echo of codes newly queued by intake.
    Codes(Vec<Code>),
}

/// Destination for status messages.
pub trait StatusSink: Send + Sync + 'static {
    /// Delivers `message`. Must not block or fail.
    fn notify(&self, message: StatusMessage);
}
