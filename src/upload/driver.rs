//! The single-flight upload state machine.
//!
//! # Run States
//!
//! ```text
//! Idle -> PreconditionCheck -> Aborted(MissingCredentials)
//!                           -> Completed (nothing pending)
//!                           -> ServerResolution -> Aborted(NoServer)
//!                                               -> Draining
//! Draining: Submit -> [OutdatedInstanceId -> Refresh -> Resubmit] -> Classify
//!           Classify -> next code | Completed | Aborted(reason)
//! ```
//!
//! A code that fails outright is dropped from stored pending before the
//! abort. Codes hit by a credential problem (invalid parameters, no user
//! details) stay pending for the next run.
//!
//! # Gate
//!
//! At most one run is active per driver (and its clones). The gate is an
//! owned mutex guard taken before the first await and dropped on every exit
//! path, so an aborted or panicking run can never leave it held.
//!
//! # Snapshot Semantics
//!
//! A run drains the pending list as it was when the run started. Codes queued
//! by intake while a run is active stay pending until the next triggered run.
//! Ledger writes are read-modify-write updates of the stored record, so they
//! never clobber codes queued mid-run.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::outcome::{AbortReason, RunOutcome, RunSummary};
use super::pacing::{Pacing, pause};
use crate::api::{RedemptionApi, ServerResolver, SubmitRequest, UserDetailsRequest};
use crate::persistence::{Settings, SettingsStore};
use crate::status::{StatusMessage, StatusSink, format};
use crate::types::{Code, InstanceId, ServerUrl, SubmissionOutcome, UserHash, UserId};

/// Drains the pending code queue against the redemption API.
///
/// Clones share the same gate, store, API, and status sink.
pub struct UploadDriver<S, A, N> {
    store: Arc<S>,
    api: Arc<A>,
    status: Arc<N>,
    pacing: Pacing,
    gate: Arc<Mutex<()>>,
}

impl<S, A, N> Clone for UploadDriver<S, A, N> {
    fn clone(&self) -> Self {
        UploadDriver {
            store: Arc::clone(&self.store),
            api: Arc::clone(&self.api),
            status: Arc::clone(&self.status),
            pacing: self.pacing,
            gate: Arc::clone(&self.gate),
        }
    }
}

/// Everything a run needs once preconditions hold.
struct RunContext {
    server: ServerUrl,
    user_id: UserId,
    hash: UserHash,
    instance_id: Option<InstanceId>,
}

impl<S, A, N> UploadDriver<S, A, N>
where
    S: SettingsStore,
    A: ServerResolver + RedemptionApi,
    N: StatusSink,
{
    pub fn new(store: Arc<S>, api: Arc<A>, status: Arc<N>) -> Self {
        UploadDriver {
            store,
            api,
            status,
            pacing: Pacing::DEFAULT,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Replaces the request pacing.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Returns true while a run holds the gate.
    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Starts a run on a background task.
    pub fn spawn(&self) -> JoinHandle<RunOutcome> {
        let driver = self.clone();
        tokio::spawn(async move { driver.start_upload_process().await })
    }

    /// Runs one upload to completion, or drops the call if a run is active.
    ///
    /// Never returns an error: every failure is reported on the status sink
    /// and folded into the returned [`RunOutcome`].
    pub async fn start_upload_process(&self) -> RunOutcome {
        let Ok(guard) = Arc::clone(&self.gate).try_lock_owned() else {
            debug!("Upload already running, dropping trigger");
            return RunOutcome::AlreadyRunning;
        };

        info!("Beginning upload");
        let outcome = self.run(guard).await;
        match &outcome {
            RunOutcome::Completed(summary) => info!(
                redeemed = summary.redeemed,
                duplicates = summary.duplicates,
                "Upload complete"
            ),
            RunOutcome::Aborted(reason) => match reason.requeued_code() {
                Some(code) => warn!(%reason, requeued = %code, "Upload aborted"),
                None => warn!(%reason, "Upload aborted"),
            },
            RunOutcome::AlreadyRunning => {}
        }
        outcome
    }

    /// The body of a run. Holding `_gate` for the whole call keeps the run
    /// exclusive; it is released when this returns or unwinds.
    #[instrument(skip_all)]
    async fn run(&self, _gate: OwnedMutexGuard<()>) -> RunOutcome {
        let settings = match self.store.load().await {
            Ok(settings) => settings,
            Err(e) => {
                error!(error = %e, "Failed to load settings");
                self.status
                    .notify(StatusMessage::Error(format::storage_failed(&e)));
                return RunOutcome::Aborted(AbortReason::Storage);
            }
        };

        let Some((user_id, hash)) = settings.credentials() else {
            error!("No credentials entered");
            self.status.notify(StatusMessage::MissingCredentials);
            return RunOutcome::Aborted(AbortReason::MissingCredentials);
        };
        let (user_id, hash) = (user_id.clone(), hash.clone());

        let mut pending = settings.ledger().pending;
        if pending.is_empty() {
            debug!("Nothing pending");
            self.status
                .notify(StatusMessage::Info(format::NOTHING_PENDING.to_string()));
            return RunOutcome::Completed(RunSummary::default());
        }

        let Some(server) = self.api.resolve_server().await else {
            error!("Failed to get play server");
            self.status
                .notify(StatusMessage::Error(format::NO_SERVER.to_string()));
            return RunOutcome::Aborted(AbortReason::NoServer);
        };
        info!(server = %server, "Got server");

        let mut ctx = RunContext {
            server,
            user_id,
            hash,
            instance_id: settings.instance_id.clone(),
        };

        pause(self.pacing.before_first_submission).await;
        self.status
            .notify(StatusMessage::Info(format::upload_starting(pending.len())));

        let mut summary = RunSummary::default();
        while let Some(code) = pending.pop() {
            if let Err(reason) = self.process_code(&mut ctx, code, &mut summary).await {
                return RunOutcome::Aborted(reason);
            }

            pause(self.pacing.between_submissions).await;
            self.status
                .notify(StatusMessage::Info(format::upload_progress(pending.len())));
        }

        info!(
            duplicates = summary.duplicates,
            redeemed = summary.redeemed,
            "Redeem complete"
        );
        self.status.notify(StatusMessage::Success(format::upload_complete(
            summary.duplicates,
            summary.redeemed,
        )));
        RunOutcome::Completed(summary)
    }

    /// Submits one code (refreshing the instance ID at most once) and records
    /// the result. Returns the abort reason if the run must stop.
    #[instrument(skip_all, fields(code = %code))]
    async fn process_code(
        &self,
        ctx: &mut RunContext,
        code: Code,
        summary: &mut RunSummary,
    ) -> Result<(), AbortReason> {
        info!("Attempting to upload code");
        let mut outcome = self.api.submit_code(&ctx.submit_request(&code)).await;

        if outcome == SubmissionOutcome::OutdatedInstanceId {
            info!("Instance ID outdated, refreshing");
            pause(self.pacing.before_refresh).await;

            let details = self.api.user_details(&ctx.details_request()).await;
            let Some(details) = details else {
                error!("Failed to retrieve user data");
                self.status
                    .notify(StatusMessage::Error(format::USER_DETAILS_FAILED.to_string()));
                return Err(AbortReason::UserDetailsUnavailable { code });
            };

            ctx.instance_id = Some(details.instance_id.clone());
            self.save_instance_id(details.instance_id).await;

            pause(self.pacing.after_refresh).await;
            outcome = self.api.submit_code(&ctx.submit_request(&code)).await;
        }

        match outcome {
            SubmissionOutcome::OutdatedInstanceId | SubmissionOutcome::Failed => {
                error!(%outcome, "Unable to submit code, aborting upload process");
                self.status
                    .notify(StatusMessage::Error(format::SUBMIT_FAILED.to_string()));
                self.discard_failed(&code).await;
                Err(AbortReason::SubmissionFailed { code })
            }
            SubmissionOutcome::InvalidParameters => {
                error!("Unable to submit code due to invalid parameters");
                self.status
                    .notify(StatusMessage::Error(format::INVALID_PARAMETERS.to_string()));
                Err(AbortReason::InvalidParameters { code })
            }
            SubmissionOutcome::AlreadyRedeemed | SubmissionOutcome::Success => {
                if outcome == SubmissionOutcome::AlreadyRedeemed {
                    info!("Already redeemed code");
                    summary.duplicates += 1;
                } else {
                    info!("Successfully redeemed");
                    summary.redeemed += 1;
                }
                self.save_redeemed(code).await
            }
        }
    }

    /// Persists a refreshed instance ID on its own. A failed write is logged
    /// and otherwise ignored; the run keeps the new ID in memory.
    async fn save_instance_id(&self, instance_id: InstanceId) {
        let result = self
            .store
            .update(move |s: &mut Settings| {
                s.instance_id = Some(instance_id);
                true
            })
            .await;
        if let Err(e) = result {
            warn!(error = %e, "Failed to save refreshed instance ID");
        }
    }

    /// Drops a code the API refused from stored pending. A failed write is
    /// logged; the code then stays queued for the next run.
    async fn discard_failed(&self, code: &Code) {
        let mut removed = false;
        let result = self
            .store
            .update(|s: &mut Settings| {
                let mut ledger = s.ledger();
                removed = ledger.discard_pending(code);
                if removed {
                    s.set_ledger(ledger);
                }
                removed
            })
            .await;
        match result {
            Ok(_) if removed => info!("Removed failed code from pending"),
            Ok(_) => debug!("Failed code was no longer pending"),
            Err(e) => warn!(error = %e, "Failed to remove failed code from pending"),
        }
    }

    /// Moves `code` from pending to redeemed in storage, enforcing the cap.
    async fn save_redeemed(&self, code: Code) -> Result<(), AbortReason> {
        let result = self
            .store
            .update(|s: &mut Settings| {
                let mut ledger = s.ledger();
                if let Some(evicted) = ledger.record_redeemed(code) {
                    debug!(evicted = %evicted, "Evicted oldest redeemed code");
                }
                s.set_ledger(ledger);
                true
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(error = %e, "Failed to save redeemed code");
                self.status
                    .notify(StatusMessage::Error(format::storage_failed(&e)));
                Err(AbortReason::Storage)
            }
        }
    }
}

impl RunContext {
    fn submit_request(&self, code: &Code) -> SubmitRequest {
        SubmitRequest {
            server: self.server.clone(),
            user_id: self.user_id.clone(),
            hash: self.hash.clone(),
            instance_id: self.instance_id.clone(),
            code: code.clone(),
        }
    }

    fn details_request(&self) -> UserDetailsRequest {
        UserDetailsRequest {
            server: self.server.clone(),
            user_id: self.user_id.clone(),
            hash: self.hash.clone(),
        }
    }
}
