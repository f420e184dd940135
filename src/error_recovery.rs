// src/error_recovery.rs
//! How long to back off after a failed API operation.

use crate::constants::RATE_LIMIT_RESET_SLACK_SECS;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// What the job should do about an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Wait this long, then retry the same operation.
    RetryAfter(Duration),
    /// Give up: the error cannot be fixed by waiting.
    Abort,
}

/// Chooses the wait for `error` at time `now`.
///
/// A rate-limit response waits until one second past the server's reset time.
/// Anything else, including a rate-limit response without a reset time,
/// waits the fixed `retry_wait`.
pub fn plan_recovery(error: &AppError, now: DateTime<Utc>, retry_wait: Duration) -> Recovery {
    if error.is_fatal() {
        return Recovery::Abort;
    }

    match error.rate_limit_reset() {
        Some(Some(reset_at)) => Recovery::RetryAfter(wait_until_reset(reset_at, now)),
        _ => Recovery::RetryAfter(retry_wait),
    }
}

/// `max(reset - now + 1s, 0)`
pub fn wait_until_reset(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let secs = (reset_at - now).num_seconds() + RATE_LIMIT_RESET_SLACK_SECS;
    Duration::from_secs(secs.max(0) as u64)
}
