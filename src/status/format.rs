//! User-facing status texts.

/// Server resolution failed.
pub const NO_SERVER: &str = "Unable to connect to Idle Champions server.";

/// The instance ID refresh returned no user data.
pub const USER_DETAILS_FAILED: &str = "Failed to retrieve user data, check user ID and hash.";

/// Submission failed, or the instance ID was still stale after a refresh.
pub const SUBMIT_FAILED: &str = "Failed to submit code for unknown reason.";

/// The API rejected the credentials.
pub const INVALID_PARAMETERS: &str = "Failed to submit code, check user/hash on settings tab.";

/// A run was triggered with nothing queued.
pub const NOTHING_PENDING: &str = "No pending codes to redeem.";

/// Reading or writing the ledger failed.
pub fn storage_failed(err: &impl std::fmt::Display) -> String {
    format!("Failed to access saved codes: {}", err)
}

/// Emitted once the server is resolved, before the first submission.
pub fn upload_starting(pending: usize) -> String {
    format!(
        "Upload starting, {} new codes to redeem. This may take a bit.",
        pending
    )
}

/// Emitted after each successfully processed code.
pub fn upload_progress(remaining: usize) -> String {
    format!("Uploading... {} codes left. This may take a bit.", remaining)
}

/// Final summary of a completed run.
///
/// The duplicate line is left blank when nothing was already redeemed.
pub fn upload_complete(duplicates: usize, redeemed: usize) -> String {
    let duplicate_line = if duplicates > 0 {
        format!("{} codes already redeemed", duplicates)
    } else {
        String::new()
    };
    format!(
        "Upload completed successfully.\n{}\n{} redeemed.",
        duplicate_line, redeemed
    )
}
