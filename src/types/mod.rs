//! Core domain types for the code redeemer.
//!
//! Identifiers are newtypes so that codes, credentials, and session IDs cannot
//! be swapped by accident.

pub mod ids;
pub mod outcome;

pub use ids::{Code, InstanceId, ServerUrl, UserHash, UserId};
pub use outcome::SubmissionOutcome;
