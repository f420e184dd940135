// src/api/rate_limit.rs
//! Rate-limit headers reported by the X API on every response.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;

const LIMIT_HEADER: &str = "x-rate-limit-limit";
const REMAINING_HEADER: &str = "x-rate-limit-remaining";
const RESET_HEADER: &str = "x-rate-limit-reset";

/// Snapshot of the rate-limit window for the endpoint just called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitStatus {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// When the window resets; the header carries epoch seconds.
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitStatus {
    /// Reads the `x-rate-limit-*` headers. Absent or garbled headers yield `None` fields.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };

        Self {
            limit: number(LIMIT_HEADER).and_then(|v| u32::try_from(v).ok()),
            remaining: number(REMAINING_HEADER).and_then(|v| u32::try_from(v).ok()),
            reset_at: number(RESET_HEADER).and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        }
    }

    /// Whether the window is used up.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Format rate limit status for logging
    pub fn format_status(&self) -> String {
        let count = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
        let reset = self
            .reset_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Rate limit: {}/{} remaining, resets {}",
            count(self.remaining),
            count(self.limit),
            reset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn parses_all_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(LIMIT_HEADER, HeaderValue::from_static("1"));
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("0"));
        headers.insert(RESET_HEADER, HeaderValue::from_static("1700000000"));

        let status = RateLimitStatus::from_headers(&headers);
        assert_eq!(status.limit, Some(1));
        assert_eq!(status.remaining, Some(0));
        assert_eq!(status.reset_at, Utc.timestamp_opt(1_700_000_000, 0).single());
        assert!(status.is_exhausted());
        assert_eq!(
            status.format_status(),
            "Rate limit: 0/1 remaining, resets 2023-11-14 22:13:20 UTC"
        );
    }

    #[test]
    fn tolerates_missing_and_garbled_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(RESET_HEADER, HeaderValue::from_static("soon"));

        let status = RateLimitStatus::from_headers(&headers);
        assert_eq!(status, RateLimitStatus::default());
        assert!(!status.is_exhausted());
        assert_eq!(
            status.format_status(),
            "Rate limit: ?/? remaining, resets unknown"
        );
    }
}
