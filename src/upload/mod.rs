//! Upload driver: drains pending codes one at a time.
//!
//! - [`driver`]: the single-flight run state machine
//! - [`outcome`]: terminal run states
//! - [`pacing`]: fixed delays between API calls

mod driver;
mod outcome;
mod pacing;

#[cfg(test)]
mod tests;

pub use driver::UploadDriver;
pub use outcome::{AbortReason, RunOutcome, RunSummary};
pub use pacing::Pacing;
