//! Code Redeemer - queues detected promo codes and redeems them one at a time.
//!
//! This library provides the ledger, persistence, redemption API client,
//! single-flight upload driver, intake worker, and HTTP surface.

pub mod api;
pub mod config;
pub mod ledger;
pub mod persistence;
pub mod server;
pub mod status;
pub mod types;
pub mod upload;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;
