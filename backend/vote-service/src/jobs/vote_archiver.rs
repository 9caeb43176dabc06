//! Vote archiver
//!
//! Once a post's voting window has closed its ledger can no longer change, so the
//! up/down tally is written to `post_vote_tally` and the `post:voted:<id>` key is
//! dropped. Time and score index entries stay untouched.
//!
//! Progress is a watermark (creation time of the newest archived post) kept under
//! `archiver:state`, so each run only scans posts that closed since the last one.
//! Re-archiving a post is a no-op on the relational side.

use crate::metrics::votes as vote_metrics;
use crate::services::{PostStore, VoteLedger};
use crate::store::{ScoreStore, StoreKey};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

const WATERMARK: &str = "watermark";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub scanned: usize,
    pub archived: usize,
}

#[derive(Clone)]
pub struct VoteArchiver {
    store: Arc<dyn ScoreStore>,
    posts: Arc<dyn PostStore>,
    ledger: VoteLedger,
    window_secs: i64,
}

impl VoteArchiver {
    pub fn new(store: Arc<dyn ScoreStore>, posts: Arc<dyn PostStore>, window_secs: i64) -> Self {
        Self {
            ledger: VoteLedger::new(store.clone()),
            store,
            posts,
            window_secs,
        }
    }

    /// Archive every post whose window closed before `now`.
    pub async fn run_once_at(&self, now: i64) -> Result<ArchiveReport> {
        let watermark = self
            .store
            .get_score(&StoreKey::ArchiverState, WATERMARK)
            .await
            .context("Failed to read archiver watermark")?
            .unwrap_or(f64::NEG_INFINITY);

        // A post is closed once now - created > window.
        let closed_before = (now - self.window_secs - 1) as f64;
        if closed_before < watermark {
            return Ok(ArchiveReport::default());
        }

        let closed = self
            .store
            .range_by_score(&StoreKey::PostTime, watermark, closed_before)
            .await
            .context("Failed to scan closed posts")?;

        let mut report = ArchiveReport {
            scanned: closed.len(),
            archived: 0,
        };
        let mut newest = None;

        for (post_id, created) in &closed {
            let tally = self
                .ledger
                .tally(post_id)
                .await
                .with_context(|| format!("Failed to tally post {}", post_id))?;

            let inserted = self
                .posts
                .archive_vote_tally(post_id, tally)
                .await
                .with_context(|| format!("Failed to archive tally of post {}", post_id))?;
            if inserted {
                report.archived += 1;
            }

            self.ledger
                .clear(post_id)
                .await
                .with_context(|| format!("Failed to clear ledger of post {}", post_id))?;
            newest = Some(*created);
        }

        if let Some(newest) = newest {
            let mut tx = self.store.begin_transaction();
            tx.set_score(StoreKey::ArchiverState, WATERMARK, newest);
            self.store
                .commit(tx)
                .await
                .context("Failed to advance archiver watermark")?;
        }

        Ok(report)
    }

    pub async fn run_once(&self) -> Result<ArchiveReport> {
        self.run_once_at(Utc::now().timestamp()).await
    }

    /// Run forever, one pass per `every`.
    pub async fn run(self, every: Duration) {
        info!(interval_secs = every.as_secs(), "Vote archiver started");
        let mut ticker = interval(every);

        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(report) => {
                    vote_metrics::record_archiver_run(true);
                    if report.scanned > 0 {
                        info!(
                            scanned = report.scanned,
                            archived = report.archived,
                            "Vote archiver pass completed"
                        );
                    }
                }
                Err(e) => {
                    vote_metrics::record_archiver_run(false);
                    error!(error = %format!("{:#}", e), "Vote archiver pass failed");
                }
            }
        }
    }
}

/// Spawnable entry point used by `main`.
pub async fn start_vote_archiver(archiver: VoteArchiver, every: Duration) {
    if every.is_zero() {
        warn!("Vote archiver interval is zero, not starting");
        return;
    }
    archiver.run(every).await;
}
