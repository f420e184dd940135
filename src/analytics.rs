// src/analytics.rs
//! Throughput arithmetic for user-facing progress messages.

use crate::constants::REQUESTS_PER_USER;
use std::time::Duration;

/// What a given request interval means in practice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputEstimate {
    pub requests_per_day: f64,
    pub users_per_day: f64,
}

impl ThroughputEstimate {
    /// Each user costs a list request plus an unblock request.
    pub fn for_interval(interval: Duration) -> Self {
        let secs = interval.as_secs_f64().max(1.0);
        let requests_per_day = 86_400.0 / secs;
        Self {
            requests_per_day,
            users_per_day: requests_per_day / REQUESTS_PER_USER as f64,
        }
    }

    /// Days needed to work through `users` blocked accounts.
    pub fn days_for(&self, users: u64) -> f64 {
        users as f64 / self.users_per_day
    }
}

/// Logs the start-of-run banner explaining the pace.
pub fn log_banner(interval: Duration) {
    let estimate = ThroughputEstimate::for_interval(interval);
    log::info!("=== X MASS UNBLOCK ===");
    log::info!("Blocked users are fetched and unblocked one request at a time.");
    log::info!(
        "At one request every {}, each user needs {} requests (fetch + unblock):",
        crate::pacing::format_wait(interval),
        REQUESTS_PER_USER
    );
    log::info!("- about {:.0} users unblocked per day", estimate.users_per_day);
    log::info!(
        "- 50k blocked users would take about {:.0} days",
        estimate.days_for(50_000)
    );
    log::info!("Progress is saved so you can stop and restart at any time.");
}
