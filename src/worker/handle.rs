//! Sending side of the intake worker.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::api::{RedemptionApi, ServerResolver};
use crate::persistence::SettingsStore;
use crate::status::StatusSink;
use crate::types::{UserHash, UserId};

use super::message::{DetectionMessage, LedgerView, WorkerMessage};
use super::worker::{IntakeWorker, Result, WorkerError};

/// Channel buffer size for worker messages.
pub const WORKER_CHANNEL_BUFFER: usize = 100;

/// Cloneable handle for talking to a running intake worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    pub fn new(tx: mpsc::Sender<WorkerMessage>) -> Self {
        WorkerHandle { tx }
    }

    /// Spawns `worker` on its own task and returns a handle to it.
    pub fn spawn<S, A, N>(
        worker: IntakeWorker<S, A, N>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>)
    where
        S: SettingsStore,
        A: ServerResolver + RedemptionApi,
        N: StatusSink,
    {
        let (tx, rx) = mpsc::channel(WORKER_CHANNEL_BUFFER);
        let task = tokio::spawn(worker.run(rx, shutdown));
        (WorkerHandle { tx }, task)
    }

    async fn send(&self, msg: WorkerMessage) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Forwards a detection message. Returns once the worker has it queued.
    #[instrument(skip_all, fields(candidates = detection.codes.len()))]
    pub async fn detected(&self, detection: DetectionMessage) -> Result<()> {
        debug!("Forwarding detection");
        self.send(WorkerMessage::Detected(detection)).await
    }

    pub async fn start_upload(&self) -> Result<()> {
        self.send(WorkerMessage::StartUpload).await
    }

    /// Stores credentials and waits for the write to land.
    pub async fn set_credentials(&self, user_id: UserId, user_hash: UserHash) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(WorkerMessage::SetCredentials {
            user_id,
            user_hash,
            reply,
        })
        .await?;
        rx.await.map_err(|_| WorkerError::ChannelClosed)??;
        Ok(())
    }

    pub async fn inspect_ledger(&self) -> Result<LedgerView> {
        let (reply, rx) = oneshot::channel();
        self.send(WorkerMessage::InspectLedger(reply)).await?;
        Ok(rx.await.map_err(|_| WorkerError::ChannelClosed)??)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(WorkerMessage::Shutdown).await
    }
}
