//! Intake worker: the serial consumer behind the HTTP surface.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   axum      │ ──► │ WorkerHandle │ ──► │ IntakeWorker │ ──► spawned upload run
//! │  (accepts)  │     │   (mpsc)     │     │  (serial)    │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Module Structure
//!
//! - [`message`]: worker message types and the detection payload
//! - [`handle`]: cloneable sender used by the HTTP layer
//! - [`worker`]: the event loop and intake wiring

mod handle;
mod message;
#[allow(clippy::module_inception)]
mod worker;


pub use handle::{WORKER_CHANNEL_BUFFER, WorkerHandle};
pub use message::{DetectionKind, DetectionMessage, LedgerView, WorkerMessage};
pub use worker::{DetectionResult, IntakeWorker, WorkerError};
