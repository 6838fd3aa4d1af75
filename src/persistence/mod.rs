//! Persistence layer for the code redeemer.
//!
//! All durable state lives in one key/value record ([`Settings`]): the two
//! ledger lists plus the session context (instance ID, user ID, user hash).
//!
//! # Contract
//!
//! - Reads are a single batch ([`SettingsStore::load`]).
//! - Writes are atomic read-modify-write cycles ([`SettingsStore::update`]).
//!   A cycle may touch any subset of keys; untouched keys keep their value.
//!
//! # File Layout
//!
//! ```text
//! <state_file>        # PersistedSettings as pretty JSON
//! <state_file>.tmp    # only exists while a write is in flight
//! ```

pub mod file_store;
pub mod settings;

pub use file_store::{FileStore, PersistedSettings, SCHEMA_VERSION, read_settings};
pub use settings::{Settings, SettingsStore, StoreError};
