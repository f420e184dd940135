// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the job.
//! Only a missing credential is fatal; everything else is classified
//! here so the recovery policy can decide how long to wait.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// X API failure reasons as a typed vocabulary.
///
/// Derived from the HTTP status, since v2 problem bodies carry a free-form
/// `title` rather than a stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XErrorCode {
    /// Too many requests in the current window
    RateLimited,
    /// Credentials were rejected
    Unauthorized,
    /// The app or token lacks access to this endpoint
    Forbidden,
    /// The user or resource does not exist
    NotFound,
    /// Request parameters were rejected
    InvalidRequest,
    /// X is failing on its side
    ServerError,
    /// Any other status
    HttpStatus(u16),
}

impl XErrorCode {
    /// Classify an HTTP status code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            400 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            other => Self::HttpStatus(other),
        }
    }
}

impl fmt::Display for XErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::ServerError => write!(f, "server_error"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Rate limit exceeded{}", reset_at.map(|t| format!(", resets at {}", t.to_rfc3339())).unwrap_or_default())]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("X API returned an error ({code}): {message}")]
    XService {
        code: XErrorCode,
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint error for {path}: {source}")]
    Checkpoint {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Errors that end the process instead of waiting and retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::MissingConfiguration(_) | AppError::ValidationError(_)
        )
    }

    /// The server-supplied reset time, if this is a rate-limit response.
    pub fn rate_limit_reset(&self) -> Option<Option<DateTime<Utc>>> {
        match self {
            AppError::RateLimited { reset_at } => Some(*reset_at),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
