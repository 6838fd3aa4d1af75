//! The redeemed/pending code ledger.
//!
//! The ledger is two ordered lists:
//!
//! - `redeemed`: codes the API accepted (or reported as already redeemed),
//!   oldest first, capped at [`REDEEMED_CAPACITY`].
//! - `pending`: codes waiting to be submitted. The upload driver pops from the
//!   end, so the most recently detected code is submitted first.
//!
//! A code is never queued twice, and a redeemed code is never queued again.

mod intake;

pub use intake::{IntakeReport, handle_detected_codes};

use serde::{Deserialize, Serialize};

use crate::types::Code;

/// Maximum number of redeemed codes retained. Older entries are evicted first.
pub const REDEEMED_CAPACITY: usize = 300;

/// The pair of redeemed and pending code lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub redeemed: Vec<Code>,
    pub pending: Vec<Code>,
}

impl Ledger {
    /// Builds a ledger from possibly-absent stored lists.
    ///
    /// Absent lists (first run) are treated as empty.
    pub fn from_parts(redeemed: Option<Vec<Code>>, pending: Option<Vec<Code>>) -> Self {
        Ledger {
            redeemed: redeemed.unwrap_or_default(),
            pending: pending.unwrap_or_default(),
        }
    }

    pub fn is_redeemed(&self, code: &Code) -> bool {
        self.redeemed.contains(code)
    }

    pub fn is_pending(&self, code: &Code) -> bool {
        self.pending.contains(code)
    }

    /// Moves `code` out of `pending` and appends it to `redeemed`.
    ///
    /// Only the last pending occurrence is removed, matching the driver's
    /// pop-from-end traversal. If `code` is not pending (it was popped from a
    /// run snapshot after another writer changed the list) it is still
    /// recorded as redeemed.
    ///
    /// Returns the evicted code, if the cap forced one out.
    pub fn record_redeemed(&mut self, code: Code) -> Option<Code> {
        self.discard_pending(&code);
        push_capped(&mut self.redeemed, code, REDEEMED_CAPACITY)
    }

    /// Removes the last pending occurrence of `code` without recording it.
    ///
    /// Returns false if `code` was not pending.
    pub fn discard_pending(&mut self, code: &Code) -> bool {
        match self.pending.iter().rposition(|c| c == code) {
            Some(idx) => {
                self.pending.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Appends `code` and evicts from the front until `list.len() <= capacity`.
///
/// Returns the most recently evicted entry.
fn push_capped(list: &mut Vec<Code>, code: Code, capacity: usize) -> Option<Code> {
    list.push(code);
    let mut evicted = None;
    while list.len() > capacity {
        evicted = Some(list.remove(0));
    }
    evicted
}
