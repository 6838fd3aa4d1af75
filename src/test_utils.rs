//! Shared test doubles and proptest generators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use tokio::sync::Notify;

use crate::api::{
    RedemptionApi, ServerResolver, SubmitRequest, UserDetails, UserDetailsRequest,
};
use crate::persistence::{Settings, SettingsStore, StoreError};
use crate::status::StatusLog;
use crate::types::{Code, InstanceId, ServerUrl, SubmissionOutcome, UserHash, UserId};
use crate::upload::{Pacing, UploadDriver};

/// Short codes from a small alphabet so generated batches collide often.
pub fn arb_code() -> impl Strategy<Value = Code> {
    "[A-D0-9]{1,3}".prop_map(|s| Code::from(s.as_str()))
}

pub fn codes(names: &[&str]) -> Vec<Code> {
    names.iter().map(|n| Code::from(*n)).collect()
}

/// Settings with valid credentials and the given ledger.
pub fn settings_with(redeemed: &[&str], pending: &[&str]) -> Settings {
    Settings {
        redeemed_codes: Some(codes(redeemed)),
        pending_codes: Some(codes(pending)),
        instance_id: Some(InstanceId::new("1000")),
        user_id: Some(UserId::new("12345")),
        user_hash: Some(UserHash::new("secret-hash")),
    }
}

// ─── Store ───

/// In-memory [`SettingsStore`] that counts writes and can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Settings>,
    writes: AtomicUsize,
    fail_loads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(settings: Settings) -> Self {
        MemoryStore {
            settings: Mutex::new(settings),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_loads(&self) {
        self.fail_loads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn injected_error() -> StoreError {
        StoreError::Io(std::io::Error::other("injected failure"))
    }

    fn load_sync(&self) -> Result<Settings, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Self::injected_error());
        }
        Ok(self.snapshot())
    }

    fn update_sync<F>(&self, f: F) -> Result<Settings, StoreError>
    where
        F: FnOnce(&mut Settings) -> bool,
    {
        let mut guard = self.settings.lock().unwrap();
        let mut next = guard.clone();
        if f(&mut next) {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::injected_error());
            }
            *guard = next.clone();
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(next)
    }
}

impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        self.load_sync()
    }

    async fn update<F>(&self, f: F) -> Result<Settings, StoreError>
    where
        F: FnOnce(&mut Settings) -> bool + Send,
    {
        self.update_sync(f)
    }
}

// ─── API ───

/// Scripted redemption API.
///
/// Submissions answer from a queue of outcomes (then `Success` once it is
/// empty); user-detail fetches answer from their own queue (then `None`).
#[derive(Debug)]
pub struct ScriptedApi {
    server: Option<ServerUrl>,
    outcomes: Mutex<VecDeque<SubmissionOutcome>>,
    details: Mutex<VecDeque<Option<UserDetails>>>,
    submissions: Mutex<Vec<SubmitRequest>>,
    details_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    hold: Option<Arc<Notify>>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        ScriptedApi {
            server: Some(ServerUrl::new("https://ps1.example/~idledragons/")),
            outcomes: Mutex::new(VecDeque::new()),
            details: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            details_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
            hold: None,
        }
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_server(mut self) -> Self {
        self.server = None;
        self
    }

    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = SubmissionOutcome>) -> Self {
        self.outcomes.lock().unwrap().extend(outcomes);
        self
    }

    pub fn with_details(self, details: impl IntoIterator<Item = Option<&'static str>>) -> Self {
        self.details.lock().unwrap().extend(details.into_iter().map(|d| {
            d.map(|id| UserDetails {
                instance_id: InstanceId::new(id),
            })
        }));
        self
    }

    /// Makes every submission wait for a permit on the returned `Notify`.
    pub fn held(mut self) -> (Self, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        self.hold = Some(Arc::clone(&notify));
        (self, notify)
    }

    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submitted_codes(&self) -> Vec<Code> {
        self.submissions().into_iter().map(|r| r.code).collect()
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn record_submission(&self, request: &SubmitRequest) -> SubmissionOutcome {
        self.submissions.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SubmissionOutcome::Success)
    }

    fn next_details(&self) -> Option<UserDetails> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        self.details.lock().unwrap().pop_front().flatten()
    }
}

impl ServerResolver for ScriptedApi {
    async fn resolve_server(&self) -> Option<ServerUrl> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.server.clone()
    }
}

impl RedemptionApi for ScriptedApi {
    async fn submit_code(&self, request: &SubmitRequest) -> SubmissionOutcome {
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.record_submission(request)
    }

    async fn user_details(&self, _request: &UserDetailsRequest) -> Option<UserDetails> {
        self.next_details()
    }
}

// ─── Driver ───

pub type TestDriver = UploadDriver<MemoryStore, ScriptedApi, StatusLog>;

/// A driver with no pacing over fresh test doubles.
pub fn test_driver(
    settings: Settings,
    api: ScriptedApi,
) -> (TestDriver, Arc<MemoryStore>, Arc<ScriptedApi>, StatusLog) {
    let store = Arc::new(MemoryStore::new(settings));
    let api = Arc::new(api);
    let status = StatusLog::new();
    let driver = UploadDriver::new(Arc::clone(&store), Arc::clone(&api), Arc::new(status.clone()))
        .with_pacing(Pacing::NONE);
    (driver, store, api, status)
}
