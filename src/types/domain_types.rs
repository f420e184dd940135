// src/types/domain_types.rs
//! Domain-specific newtypes for type safety and validation.

use super::{UserId, ValidationError};
use crate::constants::{BLOCKING_PAGE_SIZE_MAX, BLOCKING_PAGE_SIZE_MIN};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A credential value that never prints itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Create a secret, rejecting empty values.
    pub fn new(field: &'static str, value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyField(field));
        }
        Ok(Self(value.trim().to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Show just enough to tell two keys apart in logs
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "{}...", prefix)
    }
}

/// OAuth 1.0a user-context credentials for a single account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub consumer_key: Secret,
    pub consumer_secret: Secret,
    pub access_token: Secret,
    pub access_token_secret: Secret,
}

/// A user as listed by the blocking endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedUser {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
}

impl fmt::Display for BlockedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} ({}, id {})", self.username, self.name, self.id)
    }
}

/// The authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub id: UserId,
    pub username: String,
    pub name: String,
}

/// Number of blocked users requested per list call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u16);

impl PageSize {
    pub fn new(value: u16) -> Result<Self, ValidationError> {
        if !(BLOCKING_PAGE_SIZE_MIN..=BLOCKING_PAGE_SIZE_MAX).contains(&value) {
            return Err(ValidationError::OutOfBounds {
                value: u32::from(value),
                min: u32::from(BLOCKING_PAGE_SIZE_MIN),
                max: u32::from(BLOCKING_PAGE_SIZE_MAX),
            });
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

/// Validated API base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBaseUrl(Url);

impl ApiBaseUrl {
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        let parsed = Url::parse(url).map_err(|e| ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: "Only HTTP and HTTPS URLs are supported".to_string(),
            });
        }
        Ok(Self(parsed))
    }

    /// Joins an endpoint path onto the base, without a trailing slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.0.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}
