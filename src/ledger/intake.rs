//! Merging freshly detected codes into the ledger.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Ledger;
use crate::types::Code;

/// How each candidate in a detection batch was classified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeReport {
    /// Codes appended to `pending`, in the order they were appended.
    pub queued: Vec<Code>,
    /// Codes that were already waiting in `pending`.
    pub already_pending: Vec<Code>,
    /// Codes that were already in `redeemed`.
    pub already_redeemed: Vec<Code>,
    /// Candidates that were blank after trimming.
    pub rejected: usize,
}

impl IntakeReport {
    /// Returns true if the merge queued new work and the ledger must be saved.
    pub fn has_new_codes(&self) -> bool {
        !self.queued.is_empty()
    }
}

/// Merges `detected` into `ledger` without introducing duplicates.
///
/// The batch is consumed from the end. Every candidate lands in exactly one
/// class of the returned report; only new codes mutate the ledger (appended
/// to `pending`). A code repeated within the batch is queued once.
pub fn handle_detected_codes(ledger: &mut Ledger, detected: Vec<String>) -> IntakeReport {
    let mut report = IntakeReport::default();

    for candidate in detected.into_iter().rev() {
        let Some(code) = Code::parse(&candidate) else {
            debug!(candidate = %candidate, "Ignoring blank candidate");
            report.rejected += 1;
            continue;
        };

        if ledger.is_redeemed(&code) {
            debug!(code = %code, "Duplicate redeemed code");
            report.already_redeemed.push(code);
        } else if ledger.is_pending(&code) {
            debug!(code = %code, "Duplicate pending code");
            report.already_pending.push(code);
        } else {
            info!(code = %code, "New code detected");
            ledger.pending.push(code.clone());
            report.queued.push(code);
        }
    }

    report
}
