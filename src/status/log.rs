//! Bounded status history.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::{StatusMessage, StatusSink};

/// Default number of messages retained.
const DEFAULT_CAPACITY: usize = 100;

/// A status message with the time it was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub message: StatusMessage,
}

/// A [`StatusSink`] that logs every message and keeps the most recent ones.
///
/// Cheap to clone; clones share the same history.
#[derive(Debug, Clone)]
pub struct StatusLog {
    inner: Arc<Mutex<VecDeque<StatusEntry>>>,
    capacity: usize,
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StatusLog {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Returns the retained messages, oldest first.
    pub fn recent(&self) -> Vec<StatusEntry> {
        match self.inner.lock() {
            Ok(entries) => entries.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Returns just the messages, oldest first.
    pub fn messages(&self) -> Vec<StatusMessage> {
        self.recent().into_iter().map(|e| e.message).collect()
    }
}

impl StatusSink for StatusLog {
    fn notify(&self, message: StatusMessage) {
        match &message {
            StatusMessage::Info(text) => info!(status = %text, "Status"),
            StatusMessage::Success(text) => info!(status = %text, "Status: success"),
            StatusMessage::Error(text) => error!(status = %text, "Status: error"),
            StatusMessage::MissingCredentials => warn!("Status: no credentials entered"),
            StatusMessage::Codes(codes) => info!(count = codes.len(), "Status: codes queued"),
        }

        let entry = StatusEntry {
            at: Utc::now(),
            message,
        };
        let mut entries = match self.inner.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}
