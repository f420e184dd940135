// src/api/mod.rs
//! X API interaction: the ability to list and lift blocks on one account.
//!
//! Business logic depends on [`BlockListRepository`], never on HTTP details.

pub mod client;
pub mod oauth;
pub mod parser;
pub mod rate_limit;
mod responses;

use crate::error::AppError;
use crate::types::{AccountIdentity, BlockedUser, PageSize, PaginationToken, UserId};

/// One page of the blocking list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedPage {
    pub users: Vec<BlockedUser>,
    /// Present while the list has further pages.
    pub next_token: Option<PaginationToken>,
}

impl BlockedPage {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// The remote operations the unblock job needs.
#[async_trait::async_trait]
pub trait BlockListRepository: Send + Sync {
    /// Who the credentials belong to.
    async fn authenticated_user(&self) -> Result<AccountIdentity, AppError>;

    /// Fetch one page of `source`'s blocked users, starting at `cursor`.
    async fn blocked_users(
        &self,
        source: &UserId,
        cursor: Option<&PaginationToken>,
        page_size: PageSize,
    ) -> Result<BlockedPage, AppError>;

    /// Lift `source`'s block on `target`.
    async fn unblock(&self, source: &UserId, target: &UserId) -> Result<(), AppError>;
}

pub use client::XHttpClient;
pub use rate_limit::RateLimitStatus;
