//! Score store: sorted-set indexes behind voting and ranked listings.
//!
//! Logical keys:
//! - `PostTime`        post_id -> creation unix timestamp
//! - `PostScore`       post_id -> running vote score
//! - `PostVoters(id)`  voter_id -> last cast value (-1 / +1), one set per post
//! - `Community(id)`   unordered set of post_ids
//! - `ArchiverState`   bookkeeping for the vote archiver
//!
//! Cross-key writes only happen through [`ScoreStore::commit`], which applies a
//! [`Transaction`] atomically and optionally under a compare guard.

mod memory;
mod redis_store;
mod transaction;

pub use memory::MemoryScoreStore;
pub use redis_store::RedisScoreStore;
pub use transaction::{CommitOutcome, Guard, Transaction, WriteOp};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt entry in {key}: {detail}")]
    Corrupt { key: String, detail: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    PostTime,
    PostScore,
    PostVoters(String),
    Community(i64),
    ArchiverState,
}

impl StoreKey {
    pub fn post_voters(post_id: &str) -> Self {
        StoreKey::PostVoters(post_id.to_string())
    }

    pub fn community(community_id: i64) -> Self {
        StoreKey::Community(community_id)
    }

    /// Physical key name under `prefix`.
    pub fn render(&self, prefix: &str) -> String {
        match self {
            StoreKey::PostTime => format!("{}post:time", prefix),
            StoreKey::PostScore => format!("{}post:score", prefix),
            StoreKey::PostVoters(post_id) => format!("{}post:voted:{}", prefix, post_id),
            StoreKey::Community(id) => format!("{}community:{}", prefix, id),
            StoreKey::ArchiverState => format!("{}archiver:state", prefix),
        }
    }
}

/// Sorted-set store contract.
///
/// Descending ranges order ties by member, descending byte-wise (Redis `ZREVRANGE`
/// semantics); every backend must reproduce that so listings stay stable.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// `ZADD NX`. Returns whether the member was added.
    async fn set_if_absent(&self, key: &StoreKey, member: &str, score: f64) -> StoreResult<bool>;

    async fn get_score(&self, key: &StoreKey, member: &str) -> StoreResult<Option<f64>>;

    /// Scores for several members of one index, in input order.
    async fn get_scores(&self, key: &StoreKey, members: &[String])
        -> StoreResult<Vec<Option<f64>>>;

    /// Members by descending score, skipping `offset`, at most `limit`.
    async fn range_desc(&self, key: &StoreKey, offset: usize, limit: usize)
        -> StoreResult<Vec<String>>;

    /// Like [`ScoreStore::range_desc`] but restricted to members of the unordered `set`.
    async fn range_desc_within(
        &self,
        key: &StoreKey,
        set: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>>;

    /// Members with `min <= score <= max`, ascending, with their scores.
    async fn range_by_score(&self, key: &StoreKey, min: f64, max: f64)
        -> StoreResult<Vec<(String, f64)>>;

    /// `ZCOUNT` over several keys with the same bounds, in input order.
    async fn count_by_score(&self, keys: &[StoreKey], min: f64, max: f64) -> StoreResult<Vec<u64>>;

    async fn remove_member(&self, key: &StoreKey, member: &str) -> StoreResult<()>;

    async fn add_to_set(&self, key: &StoreKey, member: &str) -> StoreResult<()>;

    async fn remove_key(&self, key: &StoreKey) -> StoreResult<()>;

    /// Apply every queued write atomically. With a guard, nothing is written and
    /// `Conflict` is returned unless the guarded entry still holds the expected value.
    /// An error leaves the outcome unknown; callers must re-read before retrying.
    async fn commit(&self, tx: Transaction) -> StoreResult<CommitOutcome>;

    async fn ping(&self) -> StoreResult<()>;

    fn begin_transaction(&self) -> Transaction {
        Transaction::new()
    }

    async fn range_by_score_desc(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        self.range_desc(key, offset, limit).await
    }

    async fn range_by_time_desc(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        self.range_desc(key, offset, limit).await
    }
}
