//! Vote engine: validates a vote against the voting window and the voter's ledger
//! entry, then moves the post score and the ledger in one guarded commit.
//!
//! Delta for a transition `previous -> next`:
//!
//! | previous -> next | magnitude | sign |
//! |------------------|-----------|------|
//! | none -> up       | 1         | +    |
//! | none -> down     | 1         | -    |
//! | up -> none       | 1         | -    |
//! | down -> none     | 1         | +    |
//! | up -> down       | 2         | -    |
//! | down -> up       | 2         | +    |
//!
//! `delta = sign * magnitude * weight`. Re-submitting the stored value is rejected.
//!
//! The commit is guarded on the ledger entry still holding `previous`; when another
//! vote by the same voter lands first the engine re-reads and retries, up to
//! `max_retries` attempts.

use super::ledger::VoteLedger;
use crate::metrics::votes as vote_metrics;
use crate::models::{VoteDirection, VoteReceipt};
use crate::store::{CommitOutcome, ScoreStore, StoreError, StoreKey};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// One week.
pub const DEFAULT_VOTE_WINDOW_SECS: i64 = 7 * 24 * 3600;
/// Score worth of a single vote.
pub const DEFAULT_VOTE_WEIGHT: f64 = 432.0;
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone)]
pub struct VoteEngineConfig {
    pub window_secs: i64,
    pub weight: f64,
    pub max_retries: u32,
}

impl Default for VoteEngineConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_VOTE_WINDOW_SECS,
            weight: DEFAULT_VOTE_WEIGHT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Voting window has closed for this post")]
    VotingWindowExpired,

    #[error("Vote already recorded")]
    DuplicateVote,

    #[error("Post not found")]
    PostNotFound,

    #[error("Score store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl VoteError {
    fn outcome_label(&self) -> &'static str {
        match self {
            VoteError::VotingWindowExpired => "window_expired",
            VoteError::DuplicateVote => "duplicate",
            VoteError::PostNotFound => "not_found",
            VoteError::StoreUnavailable(_) => "store_error",
        }
    }
}

/// Signed score change for moving a voter from `previous` to `next`.
pub fn score_delta(previous: VoteDirection, next: VoteDirection, weight: f64) -> f64 {
    let (prev, next) = (previous.value(), next.value());
    let magnitude = f64::from((next - prev).abs());
    let sign = if next > prev { 1.0 } else { -1.0 };
    sign * magnitude * weight
}

#[derive(Clone)]
pub struct VoteEngine {
    store: Arc<dyn ScoreStore>,
    ledger: VoteLedger,
    config: VoteEngineConfig,
}

impl VoteEngine {
    pub fn new(store: Arc<dyn ScoreStore>, config: VoteEngineConfig) -> Self {
        Self {
            ledger: VoteLedger::new(store.clone()),
            store,
            config,
        }
    }

    pub async fn cast_vote(
        &self,
        voter_id: i64,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteReceipt, VoteError> {
        self.cast_vote_at(voter_id, post_id, direction, Utc::now().timestamp())
            .await
    }

    /// [`VoteEngine::cast_vote`] evaluated at unix time `now`.
    pub async fn cast_vote_at(
        &self,
        voter_id: i64,
        post_id: &str,
        direction: VoteDirection,
        now: i64,
    ) -> Result<VoteReceipt, VoteError> {
        let result = self.apply_vote(voter_id, post_id, direction, now).await;

        match &result {
            Ok(receipt) => {
                vote_metrics::record_vote("accepted");
                info!(
                    voter_id,
                    post_id,
                    previous = %receipt.previous,
                    next = %receipt.next,
                    delta = receipt.score_delta,
                    "Vote accepted"
                );
            }
            Err(VoteError::StoreUnavailable(e)) => {
                vote_metrics::record_vote("store_error");
                error!(voter_id, post_id, error = %e, "Vote failed: score store unavailable");
            }
            Err(e) => {
                vote_metrics::record_vote(e.outcome_label());
                info!(voter_id, post_id, direction = %direction, reason = %e, "Vote rejected");
            }
        }

        result
    }

    async fn apply_vote(
        &self,
        voter_id: i64,
        post_id: &str,
        direction: VoteDirection,
        now: i64,
    ) -> Result<VoteReceipt, VoteError> {
        let created = self
            .store
            .get_score(&StoreKey::PostTime, post_id)
            .await?
            .ok_or(VoteError::PostNotFound)?;

        if now as f64 - created > self.config.window_secs as f64 {
            return Err(VoteError::VotingWindowExpired);
        }

        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            let previous = self.ledger.current_vote(post_id, voter_id).await?;
            if previous == direction {
                return Err(VoteError::DuplicateVote);
            }

            let delta = score_delta(previous, direction, self.config.weight);
            let expected = match previous {
                VoteDirection::Retract => None,
                held => Some(held.as_score()),
            };

            let mut tx = self.store.begin_transaction();
            tx.guard(StoreKey::post_voters(post_id), voter_id.to_string(), expected)
                .increment_score(StoreKey::PostScore, post_id, delta);
            self.ledger.stage(&mut tx, post_id, voter_id, direction);

            match self.store.commit(tx).await? {
                CommitOutcome::Applied => {
                    return Ok(VoteReceipt {
                        previous,
                        next: direction,
                        score_delta: delta,
                    });
                }
                CommitOutcome::Conflict => {
                    vote_metrics::record_cas_conflict();
                    debug!(voter_id, post_id, attempt, "Ledger changed during vote, retrying");
                }
            }
        }

        Err(VoteError::StoreUnavailable(StoreError::Unavailable(format!(
            "vote by {} on post {} still conflicting after {} attempts",
            voter_id, post_id, attempts
        ))))
    }

    pub async fn on_post_created(&self, post_id: &str, community_id: i64) -> Result<(), VoteError> {
        self.on_post_created_at(post_id, community_id, Utc::now().timestamp())
            .await
    }

    /// Seed the time index, a zero score and community membership. Re-running it
    /// never moves an existing timestamp or score.
    pub async fn on_post_created_at(
        &self,
        post_id: &str,
        community_id: i64,
        now: i64,
    ) -> Result<(), VoteError> {
        let mut tx = self.store.begin_transaction();
        tx.set_if_absent(StoreKey::PostTime, post_id, now as f64)
            .set_if_absent(StoreKey::PostScore, post_id, 0.0)
            .add_to_set(StoreKey::community(community_id), post_id);

        self.store.commit(tx).await?;
        debug!(post_id, community_id, created_at = now, "Post seeded into score indexes");
        Ok(())
    }
}
