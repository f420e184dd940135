// src/job.rs
//! The unblock run loop.
//!
//! authenticate → loop { wait for the pacer → fetch a page → unblock what is
//! not yet processed → save } → stop when the list reports no further pages.
//! Every failure except a missing credential is waited out and retried.

use crate::api::{BlockListRepository, BlockedPage};
use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::JobConfig;
use crate::error::AppError;
use crate::error_recovery::{plan_recovery, Recovery};
use crate::pacing::{format_wait, RequestPacer, Timekeeper};
use crate::types::{AccountIdentity, BlockedUser, PageSize, UserId};
use std::time::Duration;

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub page_size: PageSize,
    pub request_interval: Duration,
    pub retry_wait: Duration,
    pub max_unblocks: Option<u64>,
    pub dry_run: bool,
}

impl From<&JobConfig> for JobOptions {
    fn from(config: &JobConfig) -> Self {
        Self {
            page_size: config.page_size,
            request_interval: config.request_interval,
            retry_wait: config.retry_wait,
            max_unblocks: config.max_unblocks,
            dry_run: config.dry_run,
        }
    }
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobOutcome {
    /// The remote list has no further pages.
    #[default]
    Drained,
    /// `max_unblocks` was reached.
    LimitReached,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub unblocked: u64,
    pub skipped: u64,
    pub would_unblock: u64,
    pub pages_fetched: u64,
    pub retries: u64,
    pub outcome: JobOutcome,
}

/// Drives one account's block list to empty.
pub struct UnblockJob<'a, R: ?Sized, T: ?Sized> {
    repo: &'a R,
    clock: &'a T,
    store: CheckpointStore,
    options: JobOptions,
}

impl<'a, R, T> UnblockJob<'a, R, T>
where
    R: BlockListRepository + ?Sized,
    T: Timekeeper + ?Sized,
{
    pub fn new(repo: &'a R, clock: &'a T, store: CheckpointStore, options: JobOptions) -> Self {
        Self {
            repo,
            clock,
            store,
            options,
        }
    }

    /// Runs until the list is drained or the unblock limit is hit.
    pub async fn run(&self) -> Result<JobReport, AppError> {
        let mut report = JobReport::default();

        log::info!("Authenticating with X...");
        let me = self.authenticate(&mut report).await?;
        log::info!(
            "Successfully authenticated as @{} ({}, id {})",
            me.username,
            me.name,
            me.id
        );

        let mut checkpoint = self.store.load().await;
        let mut pacer = RequestPacer::new(self.options.request_interval, checkpoint.last_request());

        if self.options.dry_run {
            log::info!("Dry run: nothing will be unblocked and progress will not be saved");
        }
        log::info!("=== PROCESSING BLOCKED USERS ===");

        loop {
            let page = self
                .fetch_page(&me.id, &mut checkpoint, &mut pacer, &mut report)
                .await?;
            report.pages_fetched += 1;

            if page.is_empty() {
                match page.next_token {
                    Some(token) => {
                        log::info!("Got empty page but there are more users (next_token present)");
                        checkpoint.set_cursor(Some(token));
                        self.persist(&checkpoint).await;
                        continue;
                    }
                    None => {
                        log::info!("No more blocked users found!");
                        break;
                    }
                }
            }

            let mut acted = false;
            for user in &page.users {
                log::info!("Fetched user {}", user);

                if checkpoint.is_processed(&user.id) {
                    log::info!("Already processed {}, skipping", user.id);
                    report.skipped += 1;
                    continue;
                }

                if self.options.dry_run {
                    log::info!("Would unblock {}", user);
                    report.would_unblock += 1;
                    continue;
                }

                self.unblock_user(&me.id, user, &mut checkpoint, &mut pacer, &mut report)
                    .await?;
                acted = true;

                checkpoint.mark_processed(user.id.clone());
                report.unblocked += 1;
                log::info!("Successfully unblocked {}", user);
                log::info!("Total processed: {} users", checkpoint.processed_count());
                self.persist(&checkpoint).await;

                if self
                    .options
                    .max_unblocks
                    .is_some_and(|limit| report.unblocked >= limit)
                {
                    log::info!("Reached the limit of {} unblocks for this run", report.unblocked);
                    report.outcome = JobOutcome::LimitReached;
                    return Ok(report);
                }
            }

            let has_more = page.next_token.is_some();
            checkpoint.set_cursor(page.next_token);
            self.persist(&checkpoint).await;

            // A final page restarts from the top to confirm the list is empty,
            // unless nothing on it changed.
            if !has_more && (!acted || self.options.dry_run) {
                log::info!("Reached the end of the block list");
                break;
            }
        }

        log::info!("=== PROCESS COMPLETE! ===");
        Ok(report)
    }

    async fn authenticate(&self, report: &mut JobReport) -> Result<AccountIdentity, AppError> {
        loop {
            match self.repo.authenticated_user().await {
                Ok(me) => return Ok(me),
                Err(e) => self.recover("authenticating", e, report).await?,
            }
        }
    }

    async fn fetch_page(
        &self,
        me: &UserId,
        checkpoint: &mut Checkpoint,
        pacer: &mut RequestPacer,
        report: &mut JobReport,
    ) -> Result<BlockedPage, AppError> {
        loop {
            let stamp = pacer.wait_turn(self.clock).await;
            checkpoint.record_request(stamp);

            log::info!("Fetching next blocked users...");
            match self
                .repo
                .blocked_users(me, checkpoint.cursor(), self.options.page_size)
                .await
            {
                Ok(page) => return Ok(page),
                Err(e) => self.recover("fetching blocked users", e, report).await?,
            }
        }
    }

    async fn unblock_user(
        &self,
        me: &UserId,
        user: &BlockedUser,
        checkpoint: &mut Checkpoint,
        pacer: &mut RequestPacer,
        report: &mut JobReport,
    ) -> Result<(), AppError> {
        loop {
            let stamp = pacer.wait_turn(self.clock).await;
            checkpoint.record_request(stamp);

            match self.repo.unblock(me, &user.id).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    let action = format!("unblocking {}", user.id);
                    self.recover(&action, e, report).await?
                }
            }
        }
    }

    /// Waits out `error`, or hands it back if waiting cannot help.
    async fn recover(
        &self,
        action: &str,
        error: AppError,
        report: &mut JobReport,
    ) -> Result<(), AppError> {
        log::error!("Error while {}: {}", action, error);

        match plan_recovery(&error, self.clock.now(), self.options.retry_wait) {
            Recovery::Abort => Err(error),
            Recovery::RetryAfter(wait) => {
                report.retries += 1;
                if error.rate_limit_reset().is_some() {
                    log::warn!("Rate limit hit. Waiting {}...", format_wait(wait));
                } else {
                    log::warn!("Waiting {} before retrying...", format_wait(wait));
                }
                self.clock.sleep(wait).await;
                Ok(())
            }
        }
    }

    /// Saves progress; a failed save is logged and the run carries on.
    async fn persist(&self, checkpoint: &Checkpoint) {
        if self.options.dry_run {
            return;
        }
        match self.store.save(checkpoint).await {
            Ok(()) => log::info!("Progress saved"),
            Err(e) => log::error!("Error saving progress: {}", e),
        }
    }
}
