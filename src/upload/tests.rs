//! Run-level tests for the upload driver.
//!
//! Every test uses `Pacing::NONE` unless it is checking pacing itself.

use std::time::Duration;

use crate::ledger::REDEEMED_CAPACITY;
use crate::persistence::Settings;
use crate::status::{StatusMessage, format};
use crate::test_utils::{ScriptedApi, codes, settings_with, test_driver};
use crate::types::{Code, InstanceId, SubmissionOutcome, UserHash, UserId};

use super::{AbortReason, Pacing, RunOutcome, RunSummary, UploadDriver};

// ─── Completion ───

#[tokio::test]
async fn drains_queue_newest_first() {
    let (driver, store, api, status) =
        test_driver(settings_with(&[], &["OLD", "MID", "NEW"]), ScriptedApi::new());

    let outcome = driver.start_upload_process().await;

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            redeemed: 3,
            duplicates: 0
        })
    );
    assert_eq!(api.submitted_codes(), codes(&["NEW", "MID", "OLD"]));

    let saved = store.snapshot();
    assert_eq!(saved.pending_codes, Some(Vec::new()));
    assert_eq!(saved.redeemed_codes, Some(codes(&["NEW", "MID", "OLD"])));

    let messages = status.messages();
    assert_eq!(
        messages.first(),
        Some(&StatusMessage::Info(format::upload_starting(3)))
    );
    assert_eq!(
        messages.last(),
        Some(&StatusMessage::Success(format::upload_complete(0, 3)))
    );
}

#[tokio::test]
async fn already_redeemed_counts_as_duplicate() {
    let api = ScriptedApi::new().with_outcomes([
        SubmissionOutcome::AlreadyRedeemed,
        SubmissionOutcome::Success,
    ]);
    let (driver, store, _api, status) = test_driver(settings_with(&[], &["A", "B"]), api);

    let outcome = driver.start_upload_process().await;

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            redeemed: 1,
            duplicates: 1
        })
    );
    assert_eq!(store.snapshot().redeemed_codes, Some(codes(&["B", "A"])));
    assert_eq!(
        status.messages().last(),
        Some(&StatusMessage::Success(format::upload_complete(1, 1)))
    );
}

#[tokio::test]
async fn progress_reported_after_each_code() {
    let (driver, _store, _api, status) =
        test_driver(settings_with(&[], &["A", "B"]), ScriptedApi::new());

    driver.start_upload_process().await;

    let progress: Vec<_> = status
        .messages()
        .into_iter()
        .filter(|m| matches!(m, StatusMessage::Info(t) if t.starts_with("Uploading...")))
        .collect();
    assert_eq!(
        progress,
        vec![
            StatusMessage::Info(format::upload_progress(1)),
            StatusMessage::Info(format::upload_progress(0)),
        ]
    );
}

#[tokio::test]
async fn ledger_saved_after_every_code() {
    let (driver, store, _api, _status) =
        test_driver(settings_with(&[], &["A", "B", "C"]), ScriptedApi::new());

    driver.start_upload_process().await;

    assert_eq!(store.writes(), 3);
}

#[tokio::test]
async fn empty_queue_completes_without_contacting_server() {
    let (driver, store, api, status) = test_driver(settings_with(&[], &[]), ScriptedApi::new());

    let outcome = driver.start_upload_process().await;

    assert_eq!(outcome, RunOutcome::Completed(RunSummary::default()));
    assert_eq!(api.resolve_calls(), 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(
        status.messages(),
        vec![StatusMessage::Info(format::NOTHING_PENDING.to_string())]
    );
}

#[tokio::test]
async fn redeemed_cap_evicts_oldest_on_success() {
    let old: Vec<String> = (0..REDEEMED_CAPACITY).map(|i| format!("OLD{i}")).collect();
    let old_refs: Vec<&str> = old.iter().map(String::as_str).collect();
    let (driver, store, _api, _status) =
        test_driver(settings_with(&old_refs, &["NEWEST"]), ScriptedApi::new());

    driver.start_upload_process().await;

    let redeemed = store.snapshot().redeemed_codes.unwrap();
    assert_eq!(redeemed.len(), REDEEMED_CAPACITY);
    assert!(!redeemed.contains(&Code::from("OLD0")));
    assert_eq!(redeemed.first(), Some(&Code::from("OLD1")));
    assert_eq!(redeemed.last(), Some(&Code::from("NEWEST")));
}

// ─── Preconditions ───

#[tokio::test]
async fn missing_user_id_reports_missing_credentials() {
    let settings = Settings {
        user_id: None,
        ..settings_with(&[], &["XYZ"])
    };
    let (driver, store, api, status) = test_driver(settings, ScriptedApi::new());

    let outcome = driver.start_upload_process().await;

    assert_eq!(outcome, RunOutcome::Aborted(AbortReason::MissingCredentials));
    assert_eq!(status.messages(), vec![StatusMessage::MissingCredentials]);
    assert_eq!(store.snapshot().pending_codes, Some(codes(&["XYZ"])));
    assert_eq!(store.writes(), 0);
    assert_eq!(api.resolve_calls(), 0);
    assert!(!driver.is_running());
}

#[tokio::test]
async fn empty_hash_reports_missing_credentials() {
    let settings = Settings {
        user_hash: Some(UserHash::new("")),
        ..settings_with(&[], &["XYZ"])
    };
    let (driver, _store, _api, _status) = test_driver(settings, ScriptedApi::new());

    assert_eq!(
        driver.start_upload_process().await,
        RunOutcome::Aborted(AbortReason::MissingCredentials)
    );
}

#[tokio::test]
async fn unresolvable_server_aborts_without_touching_queue() {
    let (driver, store, api, status) =
        test_driver(settings_with(&[], &["XYZ"]), ScriptedApi::new().without_server());

    let outcome = driver.start_upload_process().await;

    assert_eq!(outcome, RunOutcome::Aborted(AbortReason::NoServer));
    assert_eq!(
        status.messages(),
        vec![StatusMessage::Error(format::NO_SERVER.to_string())]
    );
    assert!(api.submissions().is_empty());
    assert_eq!(store.snapshot().pending_codes, Some(codes(&["XYZ"])));
}

#[tokio::test]
async fn unreadable_store_aborts() {
    let (driver, store, api, status) =
        test_driver(settings_with(&[], &["XYZ"]), ScriptedApi::new());
    store.fail_loads();

    let outcome = driver.start_upload_process().await;

    assert_eq!(outcome, RunOutcome::Aborted(AbortReason::Storage));
    assert!(matches!(status.messages()[0], StatusMessage::Error(_)));
    assert_eq!(api.resolve_calls(), 0);
}

// ─── Stale instance ID recovery ───

#[tokio::test]
async fn stale_instance_id_is_refreshed_and_resubmitted() {
    let api = ScriptedApi::new()
        .with_outcomes([SubmissionOutcome::OutdatedInstanceId, SubmissionOutcome::Success])
        .with_details([Some("2000")]);
    let (driver, store, api, status) = test_driver(settings_with(&[], &["ABC"]), api);

    let outcome = driver.start_upload_process().await;

    assert_eq!(
        outcome,
        RunOutcome::Completed(RunSummary {
            redeemed: 1,
            duplicates: 0
        })
    );

    let submissions = api.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].instance_id, Some(InstanceId::new("1000")));
    assert_eq!(submissions[1].instance_id, Some(InstanceId::new("2000")));
    assert_eq!(api.details_calls(), 1);

    let saved = store.snapshot();
    assert_eq!(saved.instance_id, Some(InstanceId::new("2000")));
    assert_eq!(saved.pending_codes, Some(Vec::new()));
    assert_eq!(saved.redeemed_codes, Some(codes(&["ABC"])));
    assert_eq!(
        status.messages().last(),
        Some(&StatusMessage::Success(format::upload_complete(0, 1)))
    );
}

#[tokio::test]
async fn refreshed_instance_id_is_used_for_later_codes() {
    let api = ScriptedApi::new()
        .with_outcomes([SubmissionOutcome::OutdatedInstanceId])
        .with_details([Some("2000")]);
    let (driver, _store, api, _status) = test_driver(settings_with(&[], &["A", "B"]), api);

    driver.start_upload_process().await;

    let submissions = api.submissions();
    assert_eq!(submissions.len(), 3);
    assert_eq!(submissions[2].code, Code::from("A"));
    assert_eq!(submissions[2].instance_id, Some(InstanceId::new("2000")));
}

#[tokio::test]
async fn second_stale_response_aborts_without_third_attempt() {
    let api = ScriptedApi::new()
        .with_outcomes([
            SubmissionOutcome::OutdatedInstanceId,
            SubmissionOutcome::OutdatedInstanceId,
        ])
        .with_details([Some("2000"), Some("3000")]);
    let (driver, store, api, status) = test_driver(settings_with(&[], &["A", "B"]), api);

    let outcome = driver.start_upload_process().await;

    assert_eq!(
        outcome,
        RunOutcome::Aborted(AbortReason::SubmissionFailed {
            code: Code::from("B")
        })
    );
    assert_eq!(api.submissions().len(), 2);
    assert_eq!(api.details_calls(), 1);
    assert_eq!(
        status.messages().last(),
        Some(&StatusMessage::Error(format::SUBMIT_FAILED.to_string()))
    );
    // Still stale after one refresh counts as a failure: the code is dropped.
    assert_eq!(store.snapshot().pending_codes, Some(codes(&["A"])));
}

#[tokio::test]
async fn failed_refresh_aborts_run() {
    let api = ScriptedApi::new()
        .with_outcomes([SubmissionOutcome::OutdatedInstanceId])
        .with_details([None]);
    let (driver, store, api, status) = test_driver(settings_with(&[], &["A"]), api);

    let outcome = driver.start_upload_process().await;

    assert_eq!(
        outcome,
        RunOutcome::Aborted(AbortReason::UserDetailsUnavailable {
            code: Code::from("A")
        })
    );
    assert_eq!(api.submissions().len(), 1);
    assert_eq!(
        status.messages().last(),
        Some(&StatusMessage::Error(format::USER_DETAILS_FAILED.to_string()))
    );
    assert_eq!(store.snapshot().instance_id, Some(InstanceId::new("1000")));
    assert_eq!(store.snapshot().pending_codes, Some(codes(&["A"])));
}

// ─── Permanent failures ───

#[tokio::test]
async fn failed_submission_aborts_after_earlier_progress_is_saved() {
    let api = ScriptedApi::new().with_outcomes([SubmissionOutcome::Success, SubmissionOutcome::Failed]);
    let (driver, store, api, _status) = test_driver(settings_with(&[], &["A", "B", "C"]), api);

    let outcome = driver.start_upload_process().await;

    assert_eq!(
        outcome,
        RunOutcome::Aborted(AbortReason::SubmissionFailed {
            code: Code::from("B")
        })
    );
    assert_eq!(api.submitted_codes(), codes(&["C", "B"]));
    let saved = store.snapshot();
    assert_eq!(saved.redeemed_codes, Some(codes(&["C"])));
    assert_eq!(saved.pending_codes, Some(codes(&["A"])));
}

#[tokio::test]
async fn failed_code_does_not_block_later_runs() {
    let api = ScriptedApi::new().with_outcomes([SubmissionOutcome::Failed]);
    let (driver, store, api, _status) =
        test_driver(settings_with(&[], &["GOOD", "EXPIRED"]), api);

    assert_eq!(
        driver.start_upload_process().await,
        RunOutcome::Aborted(AbortReason::SubmissionFailed {
            code: Code::from("EXPIRED")
        })
    );
    assert_eq!(store.snapshot().pending_codes, Some(codes(&["GOOD"])));

    assert_eq!(
        driver.start_upload_process().await,
        RunOutcome::Completed(RunSummary {
            redeemed: 1,
            duplicates: 0
        })
    );
    assert_eq!(api.submitted_codes(), codes(&["EXPIRED", "GOOD"]));
    let saved = store.snapshot();
    assert_eq!(saved.pending_codes, Some(Vec::new()));
    assert_eq!(saved.redeemed_codes, Some(codes(&["GOOD"])));
}

#[tokio::test]
async fn failed_code_stays_queued_if_removal_cannot_be_saved() {
    let api = ScriptedApi::new().with_outcomes([SubmissionOutcome::Failed]);
    let (driver, store, _api, _status) = test_driver(settings_with(&[], &["A"]), api);
    store.fail_writes();

    assert_eq!(
        driver.start_upload_process().await,
        RunOutcome::Aborted(AbortReason::SubmissionFailed {
            code: Code::from("A")
        })
    );
    // The write failed, so the code is still queued for the next run.
    assert_eq!(store.snapshot().pending_codes, Some(codes(&["A"])));
}

#[tokio::test]
async fn invalid_parameters_aborts_with_credential_hint() {
    let api = ScriptedApi::new().with_outcomes([SubmissionOutcome::InvalidParameters]);
    let (driver, store, api, status) = test_driver(settings_with(&[], &["A", "B"]), api);

    let outcome = driver.start_upload_process().await;

    assert_eq!(
        outcome,
        RunOutcome::Aborted(AbortReason::InvalidParameters {
            code: Code::from("B")
        })
    );
    assert_eq!(api.submissions().len(), 1);
    assert_eq!(
        status.messages().last(),
        Some(&StatusMessage::Error(format::INVALID_PARAMETERS.to_string()))
    );
    // Kept for a retry once the credentials are corrected.
    assert_eq!(store.snapshot().pending_codes, Some(codes(&["A", "B"])));
}

#[tokio::test]
async fn save_failure_aborts_run() {
    let (driver, store, api, status) =
        test_driver(settings_with(&[], &["A", "B"]), ScriptedApi::new());
    store.fail_writes();

    let outcome = driver.start_upload_process().await;

    assert_eq!(outcome, RunOutcome::Aborted(AbortReason::Storage));
    assert_eq!(api.submissions().len(), 1);
    assert!(matches!(status.messages().last(), Some(StatusMessage::Error(_))));
}

// ─── Single-flight gate ───

#[tokio::test]
async fn second_run_is_dropped_while_first_is_active() {
    let (api, release) = ScriptedApi::new().held();
    let (driver, _store, api, _status) = test_driver(settings_with(&[], &["A"]), api);

    let first = driver.spawn();
    while !driver.is_running() {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        driver.start_upload_process().await,
        RunOutcome::AlreadyRunning
    );

    release.notify_one();
    assert!(first.await.unwrap().is_completed());
    assert_eq!(api.submissions().len(), 1);
}

#[tokio::test]
async fn clones_share_the_gate() {
    let (api, release) = ScriptedApi::new().held();
    let (driver, _store, _api, _status) = test_driver(settings_with(&[], &["A"]), api);
    let clone = driver.clone();

    let first = driver.spawn();
    while !driver.is_running() {
        tokio::task::yield_now().await;
    }

    assert_eq!(clone.start_upload_process().await, RunOutcome::AlreadyRunning);

    release.notify_one();
    first.await.unwrap();
}

#[tokio::test]
async fn gate_released_after_every_abort() {
    let api = ScriptedApi::new().with_outcomes([
        SubmissionOutcome::InvalidParameters,
        SubmissionOutcome::OutdatedInstanceId,
        SubmissionOutcome::Failed,
    ]);
    let (driver, store, _api, _status) = test_driver(settings_with(&[], &["A", "B"]), api);

    for expected in [
        AbortReason::InvalidParameters {
            code: Code::from("B"),
        },
        AbortReason::UserDetailsUnavailable {
            code: Code::from("B"),
        },
        AbortReason::SubmissionFailed {
            code: Code::from("B"),
        },
    ] {
        assert_eq!(
            driver.start_upload_process().await,
            RunOutcome::Aborted(expected)
        );
        assert!(!driver.is_running());
    }

    // Next run is allowed and redeems the code that remains.
    assert!(driver.start_upload_process().await.is_completed());
    let saved = store.snapshot();
    assert_eq!(saved.pending_codes, Some(Vec::new()));
    assert_eq!(saved.redeemed_codes, Some(codes(&["A"])));
}

#[tokio::test]
async fn gate_released_after_missing_credentials() {
    let settings = Settings {
        user_id: Some(UserId::new("")),
        ..settings_with(&[], &["XYZ"])
    };
    let (driver, _store, _api, _status) = test_driver(settings, ScriptedApi::new());

    driver.start_upload_process().await;
    let second = driver.start_upload_process().await;

    assert_eq!(second, RunOutcome::Aborted(AbortReason::MissingCredentials));
}

// ─── Snapshot semantics ───

#[tokio::test]
async fn codes_queued_mid_run_survive_and_wait_for_next_run() {
    let (api, release) = ScriptedApi::new().held();
    let (driver, store, api, _status) = test_driver(settings_with(&[], &["A"]), api);

    let run = driver.spawn();
    while !driver.is_running() {
        tokio::task::yield_now().await;
    }

    // Intake queues a new code while the run is waiting on the API.
    use crate::persistence::SettingsStore;
    store
        .update(|s| {
            let mut ledger = s.ledger();
            ledger.pending.push(Code::from("LATE"));
            s.set_ledger(ledger);
            true
        })
        .await
        .unwrap();

    release.notify_one();
    run.await.unwrap();

    assert_eq!(api.submitted_codes(), codes(&["A"]));
    let saved = store.snapshot();
    assert_eq!(saved.pending_codes, Some(codes(&["LATE"])));
    assert_eq!(saved.redeemed_codes, Some(codes(&["A"])));

    release.notify_one();
    driver.start_upload_process().await;
    assert_eq!(api.submitted_codes(), codes(&["A", "LATE"]));
}

// ─── Pacing ───

#[tokio::test(start_paused = true)]
async fn default_pacing_waits_between_calls() {
    let (driver, _store, _api, _status) =
        test_driver(settings_with(&[], &["A", "B"]), ScriptedApi::new());
    let driver = driver.with_pacing(Pacing::DEFAULT);

    let start = tokio::time::Instant::now();
    driver.start_upload_process().await;

    // 3s before the first submission, then 10s after each of two codes.
    assert_eq!(start.elapsed(), Duration::from_secs(23));
}

#[tokio::test(start_paused = true)]
async fn refresh_adds_two_pauses() {
    let api = ScriptedApi::new()
        .with_outcomes([SubmissionOutcome::OutdatedInstanceId])
        .with_details([Some("2000")]);
    let (driver, _store, _api, _status) = test_driver(settings_with(&[], &["A"]), api);
    let driver = driver.with_pacing(Pacing::DEFAULT);

    let start = tokio::time::Instant::now();
    driver.start_upload_process().await;

    assert_eq!(start.elapsed(), Duration::from_secs(3 + 3 + 3 + 10));
}

#[test]
fn driver_defaults_to_policy_pacing() {
    let store = std::sync::Arc::new(crate::test_utils::MemoryStore::default());
    let api = std::sync::Arc::new(ScriptedApi::new());
    let status = std::sync::Arc::new(crate::status::StatusLog::new());
    let driver = UploadDriver::new(store, api, status);
    assert_eq!(driver.pacing(), Pacing::DEFAULT);
}
