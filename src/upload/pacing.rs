//! Fixed request pacing.
//!
//! The redemption API throttles and flags accounts that submit too quickly.
//! These delays are policy constants: no backoff, no jitter.

use std::time::Duration;

/// Delays inserted between API calls during an upload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// After resolving the server, before the first submission.
    pub before_first_submission: Duration,

    /// After an `OutdatedInstanceId` response, before fetching user details.
    pub before_refresh: Duration,

    /// After storing the refreshed instance ID, before resubmitting.
    pub after_refresh: Duration,

    /// After each processed code, before the next submission.
    pub between_submissions: Duration,
}

impl Pacing {
    /// The production pacing: 3s, 3s, 3s, 10s.
    pub const DEFAULT: Self = Self {
        before_first_submission: Duration::from_secs(3),
        before_refresh: Duration::from_secs(3),
        after_refresh: Duration::from_secs(3),
        between_submissions: Duration::from_secs(10),
    };

    /// No delays at all.
    pub const NONE: Self = Self {
        before_first_submission: Duration::ZERO,
        before_refresh: Duration::ZERO,
        after_refresh: Duration::ZERO,
        between_submissions: Duration::ZERO,
    };
}

impl Default for Pacing {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sleeps for `delay`, skipping the timer entirely for zero.
pub(super) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
