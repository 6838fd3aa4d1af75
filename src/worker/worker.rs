//! The intake event loop.
//!
//! A single worker owns the store handle and the upload driver. It processes
//! messages serially, so two detection batches are never merged at the same
//! time. Upload runs are spawned onto their own tasks: intake keeps being
//! served while a run is draining.
//!
//! # Detection Flow
//!
//! 1. Ignore anything that is not a `codes` message
//! 2. Merge the batch into the stored ledger in one atomic update
//! 3. Skip the write entirely if nothing new was queued
//! 4. Echo the newly queued codes on the status channel
//! 5. Trigger an upload run (dropped by the driver if one is active)

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::api::{RedemptionApi, ServerResolver};
use crate::ledger::{IntakeReport, handle_detected_codes};
use crate::persistence::{Settings, SettingsStore, StoreError};
use crate::status::{StatusMessage, StatusSink};
use crate::types::{UserHash, UserId};
use crate::upload::{RunOutcome, UploadDriver};

use super::message::{DetectionKind, DetectionMessage, LedgerView, WorkerMessage};

/// Errors that can occur during worker operations.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The settings store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The worker is gone: its channel is closed or it dropped a reply.
    #[error("worker unavailable: channel closed")]
    ChannelClosed,
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// What a detection message led to.
#[derive(Debug)]
pub struct DetectionResult {
    /// Classification of every candidate in the batch.
    pub report: IntakeReport,

    /// The triggered upload run, if new codes were queued.
    pub upload: Option<JoinHandle<RunOutcome>>,
}

/// Serial consumer of [`WorkerMessage`]s.
pub struct IntakeWorker<S, A, N> {
    store: Arc<S>,
    driver: UploadDriver<S, A, N>,
    status: Arc<N>,
}

impl<S, A, N> IntakeWorker<S, A, N>
where
    S: SettingsStore,
    A: ServerResolver + RedemptionApi,
    N: StatusSink,
{
    pub fn new(store: Arc<S>, driver: UploadDriver<S, A, N>, status: Arc<N>) -> Self {
        IntakeWorker {
            store,
            driver,
            status,
        }
    }

    /// Runs the event loop until shutdown.
    ///
    /// Exits when the token is cancelled, a `Shutdown` message arrives, or
    /// every sender has been dropped. Errors from individual messages are
    /// logged and do not stop the loop.
    pub async fn run(self, mut rx: mpsc::Receiver<WorkerMessage>, shutdown: CancellationToken) {
        info!("Intake worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping worker");
                    break;
                }

                msg = rx.recv() => {
                    match msg {
                        Some(WorkerMessage::Shutdown) => {
                            info!("Shutdown message received");
                            break;
                        }
                        Some(msg) => {
                            if let Err(e) = self.handle_message(msg).await {
                                error!(error = %e, "Error handling message");
                            }
                        }
                        None => {
                            info!("Message channel closed");
                            break;
                        }
                    }
                }
            }
        }

        if self.driver.is_running() {
            info!("Upload run still in flight; it will finish on its own task");
        }
        info!("Intake worker stopped");
    }

    /// Handles one message.
    pub async fn handle_message(&self, msg: WorkerMessage) -> Result<()> {
        match msg {
            WorkerMessage::Detected(detection) => {
                // The run is detached; its outcome is reported on the status channel.
                self.handle_detection(detection).await?;
            }
            WorkerMessage::StartUpload => {
                info!("Manual upload requested");
                let _run = self.driver.spawn();
            }
            WorkerMessage::SetCredentials {
                user_id,
                user_hash,
                reply,
            } => {
                let result = self.set_credentials(user_id, user_hash).await;
                if reply.send(result).is_err() {
                    debug!("Credentials requester went away");
                }
            }
            WorkerMessage::InspectLedger(reply) => {
                let view = self.store.load().await.map(|s| LedgerView::from(&s));
                if reply.send(view).is_err() {
                    debug!("Ledger requester went away");
                }
            }
            WorkerMessage::Shutdown => {
                // Handled in the event loop.
            }
        }
        Ok(())
    }

    /// Merges a detection batch into the stored ledger and triggers a run if
    /// anything new was queued.
    #[instrument(skip_all, fields(candidates = detection.codes.len()))]
    pub async fn handle_detection(&self, detection: DetectionMessage) -> Result<DetectionResult> {
        if detection.message_type != DetectionKind::Codes {
            debug!(kind = ?detection.message_type, "Ignoring non-code message");
            return Ok(DetectionResult {
                report: IntakeReport::default(),
                upload: None,
            });
        }

        let mut report = IntakeReport::default();
        self.store
            .update(|s: &mut Settings| {
                let mut ledger = s.ledger();
                report = handle_detected_codes(&mut ledger, detection.codes);
                if !report.has_new_codes() {
                    return false;
                }
                s.set_ledger(ledger);
                true
            })
            .await?;

        if report.rejected > 0 {
            warn!(rejected = report.rejected, "Discarded blank candidates");
        }

        if !report.has_new_codes() {
            debug!(
                already_pending = report.already_pending.len(),
                already_redeemed = report.already_redeemed.len(),
                "No new codes"
            );
            return Ok(DetectionResult {
                report,
                upload: None,
            });
        }

        info!(queued = report.queued.len(), "Queued new codes");
        self.status
            .notify(StatusMessage::Codes(report.queued.clone()));
        let upload = Some(self.driver.spawn());

        Ok(DetectionResult { report, upload })
    }

    /// Stores new user credentials. Empty values are rejected before this
    /// point, by the HTTP layer.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn set_credentials(
        &self,
        user_id: UserId,
        user_hash: UserHash,
    ) -> std::result::Result<(), StoreError> {
        self.store
            .update(move |s: &mut Settings| {
                s.user_id = Some(user_id);
                s.user_hash = Some(user_hash);
                true
            })
            .await?;
        info!("Credentials updated");
        Ok(())
    }
}
