// src/checkpoint.rs
//! Persisted progress: which users are done, where the list cursor stands,
//! and when the last paced request went out.
//!
//! The JSON layout (`processedUsers`, `paginationToken`, `lastRequestTime`
//! in epoch milliseconds) is shared with progress files written by earlier
//! versions of the tool, so an old run can be resumed as-is.

use crate::constants::CORRUPT_CHECKPOINT_SUFFIX;
use crate::error::AppError;
use crate::types::{PaginationToken, UserId};
use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Progress record for one account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(default)]
    processed_users: IndexMap<UserId, bool>,
    #[serde(default)]
    pagination_token: Option<PaginationToken>,
    #[serde(default)]
    last_request_time: i64,
}

impl Checkpoint {
    pub fn is_processed(&self, id: &UserId) -> bool {
        self.processed_users.get(id).copied().unwrap_or(false)
    }

    /// Returns `false` if the user was already marked.
    pub fn mark_processed(&mut self, id: UserId) -> bool {
        !matches!(self.processed_users.insert(id, true), Some(true))
    }

    pub fn processed_count(&self) -> usize {
        self.processed_users.values().filter(|done| **done).count()
    }

    /// The saved list position. A blank token counts as none.
    pub fn cursor(&self) -> Option<&PaginationToken> {
        self.pagination_token
            .as_ref()
            .filter(|token| !token.as_str().trim().is_empty())
    }

    pub fn set_cursor(&mut self, cursor: Option<PaginationToken>) {
        self.pagination_token = cursor;
    }

    pub fn record_request(&mut self, at: DateTime<Utc>) {
        self.last_request_time = at.timestamp_millis();
    }

    /// When the last paced request went out, if ever.
    pub fn last_request(&self) -> Option<DateTime<Utc>> {
        if self.last_request_time <= 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.last_request_time).single()
    }
}

/// Reads and writes the checkpoint file.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the checkpoint, starting fresh when there is nothing usable.
    ///
    /// A file that exists but does not parse is moved aside to
    /// `<name>.corrupt` so it is not overwritten by the next save.
    pub async fn load(&self) -> Checkpoint {
        match self.try_load().await {
            Ok(Some(checkpoint)) => {
                log::info!("Loaded saved progress from {}:", self.path.display());
                log::info!("- Processed {} users", checkpoint.processed_count());
                if checkpoint.cursor().is_some() {
                    log::info!("- Found saved position in list");
                }
                checkpoint
            }
            Ok(None) => {
                log::info!(
                    "No saved progress at {}, starting fresh",
                    self.path.display()
                );
                Checkpoint::default()
            }
            Err(AppError::Checkpoint { source, .. }) => {
                log::error!(
                    "Saved progress at {} is unreadable: {}",
                    self.path.display(),
                    source
                );
                self.quarantine().await;
                Checkpoint::default()
            }
            Err(e) => {
                log::error!("Error loading saved progress: {}", e);
                Checkpoint::default()
            }
        }
    }

    /// Reads the file; `Ok(None)` when it does not exist.
    pub async fn try_load(&self) -> Result<Option<Checkpoint>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        // Bad encoding is a parse failure too, so it lands in quarantine
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| AppError::Checkpoint {
                path: self.path.clone(),
                source,
            })
    }

    /// Writes the checkpoint atomically: temp file, then rename over the old one.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(checkpoint).map_err(|source| {
            AppError::Checkpoint {
                path: self.path.clone(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.sibling("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::debug!("Progress saved to {}", self.path.display());
        Ok(())
    }

    async fn quarantine(&self) {
        let aside = self.sibling(CORRUPT_CHECKPOINT_SUFFIX);
        match tokio::fs::rename(&self.path, &aside).await {
            Ok(()) => log::warn!("Moved unreadable progress file to {}", aside.display()),
            Err(e) => log::warn!(
                "Could not move unreadable progress file aside ({}); it will be overwritten",
                e
            ),
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}
