// src/pacing.rs
//! Time capabilities and the request pacer.
//!
//! The job never calls `Utc::now()` or `tokio::time::sleep` directly; it asks
//! a [`Timekeeper`], so runs can be replayed against a manual clock.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The ability to tell the time and to wait.
#[async_trait::async_trait]
pub trait Timekeeper: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

/// Wall clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimekeeper;

#[async_trait::async_trait]
impl Timekeeper for SystemTimekeeper {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock that only moves when slept on. Every sleep is recorded.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Moves the clock without recording a sleep.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }

    /// Every non-zero sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Sum of all sleeps.
    pub fn total_slept(&self) -> Duration {
        self.lock().sleeps.iter().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        // A poisoned clock only means a test already panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl Timekeeper for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let mut state = self.lock();
        state.now += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        state.sleeps.push(duration);
    }
}

/// Time still owed before the next request, given when the last one went out.
pub fn remaining_wait(
    last_request: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: Duration,
) -> Duration {
    let Some(last) = last_request else {
        return Duration::ZERO;
    };
    let interval = chrono::Duration::from_std(interval).unwrap_or(chrono::Duration::MAX);
    let ready_at = last.checked_add_signed(interval).unwrap_or(DateTime::<Utc>::MAX_UTC);
    (ready_at - now).to_std().unwrap_or(Duration::ZERO)
}

/// Spaces paced requests at least `interval` apart.
#[derive(Debug, Clone)]
pub struct RequestPacer {
    interval: Duration,
    last_request: Option<DateTime<Utc>>,
}

impl RequestPacer {
    pub fn new(interval: Duration, last_request: Option<DateTime<Utc>>) -> Self {
        Self {
            interval,
            last_request,
        }
    }

    /// Sleeps until the window allows another request, then stamps the request time.
    pub async fn wait_turn<T: Timekeeper + ?Sized>(&mut self, clock: &T) -> DateTime<Utc> {
        let wait = remaining_wait(self.last_request, clock.now(), self.interval);
        if !wait.is_zero() {
            log::info!("Waiting {} before next request...", format_wait(wait));
            clock.sleep(wait).await;
        }
        let stamp = clock.now();
        self.last_request = Some(stamp);
        stamp
    }
}

/// Renders a wait the way the log lines read best: `14.5 minutes`, `42 seconds`.
pub fn format_wait(wait: Duration) -> String {
    let secs = wait.as_secs_f64();
    if secs >= 3600.0 * 24.0 {
        format!("{:.1} days", secs / 86_400.0)
    } else if secs >= 3600.0 {
        format!("{:.1} hours", secs / 3600.0)
    } else if secs >= 60.0 {
        format!("{:.1} minutes", secs / 60.0)
    } else {
        format!("{} seconds", wait.as_secs())
    }
}
