// src/lib.rs
//! xunblock library — lifts every block on an X account, one rate window at a time.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — `AppError`, `XErrorCode`, `ValidationError`
//! - **Configuration** — `CommandLineInput`, `JobConfig`
//! - **Domain types** — `UserId`, `BlockedUser`, `PaginationToken`, `Credentials`
//! - **API client** — `BlockListRepository`, `XHttpClient`, `OAuthSigner`
//! - **Progress** — `Checkpoint`, `CheckpointStore`
//! - **Pacing** — `Timekeeper`, `RequestPacer`, `ManualClock`
//! - **Job** — `UnblockJob`, `JobOptions`, `JobReport`

pub mod analytics;
pub mod api;
pub mod checkpoint;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod job;
pub mod pacing;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, XErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, CredentialsFile, JobConfig};

// --- Domain Types ---
pub use crate::types::{
    AccountIdentity, ApiBaseUrl, BlockedUser, Credentials, PageSize, PaginationToken, Secret,
    UserId,
};

// --- API Client ---
pub use crate::api::{
    oauth::OAuthSigner, BlockListRepository, BlockedPage, RateLimitStatus, XHttpClient,
};

// --- Progress ---
pub use crate::checkpoint::{Checkpoint, CheckpointStore};

// --- Pacing ---
pub use crate::pacing::{ManualClock, RequestPacer, SystemTimekeeper, Timekeeper};

// --- Job ---
pub use crate::error_recovery::{plan_recovery, Recovery};
pub use crate::job::{JobOptions, JobOutcome, JobReport, UnblockJob};
