// src/api/responses.rs
//! Wire shapes of the X API v2 responses this job consumes.
//!
//! These mirror the JSON exactly and are converted to domain types by
//! the parser; nothing outside `api` sees them.

use crate::types::{AccountIdentity, BlockedUser};
use serde::Deserialize;

/// `{"data": {...}}` envelope of `GET /2/users/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    pub data: Option<AccountIdentity>,
}

/// Envelope of `GET /2/users/:id/blocking`.
///
/// An exhausted list comes back as `{"meta": {"result_count": 0}}`
/// with no `data` key at all.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockingListEnvelope {
    #[serde(default)]
    pub data: Vec<BlockedUser>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub result_count: u32,
    pub next_token: Option<String>,
    #[allow(dead_code)]
    pub previous_token: Option<String>,
}

/// Envelope of `DELETE /2/users/:source/blocking/:target`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnblockEnvelope {
    pub data: Option<BlockingState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockingState {
    pub blocking: bool,
}

/// Error bodies come in two flavours: RFC 7807 problem documents and
/// the legacy `{"errors": [...]}` list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    pub title: Option<String>,
    pub detail: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorItem {
    pub message: Option<String>,
    pub detail: Option<String>,
}

impl ErrorBody {
    /// The most descriptive message the body offers.
    pub fn message(&self) -> Option<String> {
        if let Some(detail) = &self.detail {
            return Some(match &self.title {
                Some(title) if title != detail => format!("{}: {}", title, detail),
                _ => detail.clone(),
            });
        }
        if let Some(title) = &self.title {
            return Some(title.clone());
        }
        let messages: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| e.message.as_deref().or(e.detail.as_deref()))
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    }
}
