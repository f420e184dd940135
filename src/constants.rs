// src/constants.rs
//! Domain constants that define the operational boundaries of the job.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how the job
//! paces itself against the X API and where it keeps its state.

// ---------------------------------------------------------------------------
// X API boundaries
// ---------------------------------------------------------------------------

/// Base URL of the X API v2.
pub const X_API_BASE_URL: &str = "https://api.twitter.com/2";

/// Smallest `max_results` the blocking endpoint accepts.
pub const BLOCKING_PAGE_SIZE_MIN: u16 = 1;

/// Largest `max_results` the blocking endpoint accepts.
pub const BLOCKING_PAGE_SIZE_MAX: u16 = 1000;

/// Default page size: stream one blocked user per list request.
pub const DEFAULT_PAGE_SIZE: u16 = 1;

/// The free API tier allows one request per 15 minutes on these endpoints.
pub const FREE_TIER_REQUEST_INTERVAL_SECS: u64 = 15 * 60;

/// Fixed wait applied after any error that is not a rate-limit response.
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 15 * 60;

/// Slack added on top of the server-supplied rate-limit reset time.
pub const RATE_LIMIT_RESET_SLACK_SECS: i64 = 1;

/// Each blocked user costs one list request plus one unblock request.
pub const REQUESTS_PER_USER: u64 = 2;

// ---------------------------------------------------------------------------
// Local files
// ---------------------------------------------------------------------------

/// Default location of the progress checkpoint.
pub const DEFAULT_CHECKPOINT_FILE: &str = "unblock_progress.json";

/// Default location of the credentials file.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Suffix given to a checkpoint file that could not be parsed.
pub const CORRUPT_CHECKPOINT_SUFFIX: &str = "corrupt";

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
