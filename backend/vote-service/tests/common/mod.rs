//! Shared fixtures for vote-service integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use vote_service::models::{PostRecord, VoteTally};
use vote_service::services::{PostStore, PostStoreError};
use vote_service::store::{
    CommitOutcome, MemoryScoreStore, ScoreStore, StoreError, StoreKey, StoreResult, Transaction,
};

pub const CREATED_AT: i64 = 1_700_000_000;

pub fn post_record(post_id: i64, community_id: i64) -> PostRecord {
    PostRecord {
        post_id,
        author_id: 1,
        community_id,
        status: 1,
        title: format!("post {}", post_id),
        content: "body".to_string(),
        create_time: Utc
            .timestamp_opt(CREATED_AT, 0)
            .single()
            .unwrap_or_else(Utc::now),
    }
}

/// In-memory `post` table plus archived tallies.
#[derive(Clone, Default)]
pub struct MockPostStore {
    posts: Arc<Mutex<HashMap<i64, PostRecord>>>,
    archived: Arc<Mutex<HashMap<String, VoteTally>>>,
}

impl MockPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: PostRecord) {
        self.posts.lock().unwrap().insert(record.post_id, record);
    }

    pub fn remove(&self, post_id: i64) {
        self.posts.lock().unwrap().remove(&post_id);
    }

    pub fn archived(&self, post_id: &str) -> Option<VoteTally> {
        self.archived.lock().unwrap().get(post_id).copied()
    }

    pub fn archived_count(&self) -> usize {
        self.archived.lock().unwrap().len()
    }
}

#[async_trait]
impl PostStore for MockPostStore {
    async fn post_community(&self, post_id: &str) -> Result<Option<i64>, PostStoreError> {
        let Ok(id) = post_id.parse::<i64>() else {
            return Ok(None);
        };
        Ok(self.posts.lock().unwrap().get(&id).map(|p| p.community_id))
    }

    async fn hydrate_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<Option<PostRecord>>, PostStoreError> {
        let posts = self.posts.lock().unwrap();
        Ok(post_ids
            .iter()
            .map(|id| id.parse::<i64>().ok().and_then(|id| posts.get(&id).cloned()))
            .collect())
    }

    async fn archive_vote_tally(
        &self,
        post_id: &str,
        tally: VoteTally,
    ) -> Result<bool, PostStoreError> {
        let mut archived = self.archived.lock().unwrap();
        if archived.contains_key(post_id) {
            return Ok(false);
        }
        archived.insert(post_id.to_string(), tally);
        Ok(true)
    }

    async fn archived_tallies(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<Option<VoteTally>>, PostStoreError> {
        let archived = self.archived.lock().unwrap();
        Ok(post_ids.iter().map(|id| archived.get(id).copied()).collect())
    }
}

/// Delegates to a [`MemoryScoreStore`], but commits queued "concurrent" transactions
/// right before the next guarded commit, the way a racing request would.
pub struct RacingStore {
    pub inner: Arc<MemoryScoreStore>,
    interference: Mutex<Vec<Transaction>>,
    guarded_commits: Mutex<u32>,
}

impl RacingStore {
    pub fn new(inner: Arc<MemoryScoreStore>) -> Self {
        Self {
            inner,
            interference: Mutex::new(Vec::new()),
            guarded_commits: Mutex::new(0),
        }
    }

    pub fn interfere_with(&self, tx: Transaction) {
        self.interference.lock().unwrap().push(tx);
    }

    pub fn guarded_commits(&self) -> u32 {
        *self.guarded_commits.lock().unwrap()
    }
}

#[async_trait]
impl ScoreStore for RacingStore {
    async fn set_if_absent(&self, key: &StoreKey, member: &str, score: f64) -> StoreResult<bool> {
        self.inner.set_if_absent(key, member, score).await
    }

    async fn get_score(&self, key: &StoreKey, member: &str) -> StoreResult<Option<f64>> {
        self.inner.get_score(key, member).await
    }

    async fn get_scores(
        &self,
        key: &StoreKey,
        members: &[String],
    ) -> StoreResult<Vec<Option<f64>>> {
        self.inner.get_scores(key, members).await
    }

    async fn range_desc(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        self.inner.range_desc(key, offset, limit).await
    }

    async fn range_desc_within(
        &self,
        key: &StoreKey,
        set: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        self.inner.range_desc_within(key, set, offset, limit).await
    }

    async fn range_by_score(
        &self,
        key: &StoreKey,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.inner.range_by_score(key, min, max).await
    }

    async fn count_by_score(&self, keys: &[StoreKey], min: f64, max: f64) -> StoreResult<Vec<u64>> {
        self.inner.count_by_score(keys, min, max).await
    }

    async fn remove_member(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        self.inner.remove_member(key, member).await
    }

    async fn add_to_set(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        self.inner.add_to_set(key, member).await
    }

    async fn remove_key(&self, key: &StoreKey) -> StoreResult<()> {
        self.inner.remove_key(key).await
    }

    async fn commit(&self, tx: Transaction) -> StoreResult<CommitOutcome> {
        if tx.guard_condition().is_some() {
            *self.guarded_commits.lock().unwrap() += 1;
            let racing = self.interference.lock().unwrap().pop();
            if let Some(racing) = racing {
                self.inner.commit(racing).await?;
            }
        }
        self.inner.commit(tx).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

/// Store whose guarded commits never apply.
pub struct ConflictingStore {
    pub inner: Arc<MemoryScoreStore>,
}

#[async_trait]
impl ScoreStore for ConflictingStore {
    async fn set_if_absent(&self, key: &StoreKey, member: &str, score: f64) -> StoreResult<bool> {
        self.inner.set_if_absent(key, member, score).await
    }

    async fn get_score(&self, key: &StoreKey, member: &str) -> StoreResult<Option<f64>> {
        self.inner.get_score(key, member).await
    }

    async fn get_scores(
        &self,
        key: &StoreKey,
        members: &[String],
    ) -> StoreResult<Vec<Option<f64>>> {
        self.inner.get_scores(key, members).await
    }

    async fn range_desc(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        self.inner.range_desc(key, offset, limit).await
    }

    async fn range_desc_within(
        &self,
        key: &StoreKey,
        set: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        self.inner.range_desc_within(key, set, offset, limit).await
    }

    async fn range_by_score(
        &self,
        key: &StoreKey,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        self.inner.range_by_score(key, min, max).await
    }

    async fn count_by_score(&self, keys: &[StoreKey], min: f64, max: f64) -> StoreResult<Vec<u64>> {
        self.inner.count_by_score(keys, min, max).await
    }

    async fn remove_member(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        self.inner.remove_member(key, member).await
    }

    async fn add_to_set(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        self.inner.add_to_set(key, member).await
    }

    async fn remove_key(&self, key: &StoreKey) -> StoreResult<()> {
        self.inner.remove_key(key).await
    }

    async fn commit(&self, tx: Transaction) -> StoreResult<CommitOutcome> {
        if tx.guard_condition().is_some() {
            return Ok(CommitOutcome::Conflict);
        }
        self.inner.commit(tx).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

/// Store that fails every call, like Redis being down.
pub struct UnavailableStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl ScoreStore for UnavailableStore {
    async fn set_if_absent(&self, _: &StoreKey, _: &str, _: f64) -> StoreResult<bool> {
        down()
    }

    async fn get_score(&self, _: &StoreKey, _: &str) -> StoreResult<Option<f64>> {
        down()
    }

    async fn get_scores(&self, _: &StoreKey, _: &[String]) -> StoreResult<Vec<Option<f64>>> {
        down()
    }

    async fn range_desc(&self, _: &StoreKey, _: usize, _: usize) -> StoreResult<Vec<String>> {
        down()
    }

    async fn range_desc_within(
        &self,
        _: &StoreKey,
        _: &StoreKey,
        _: usize,
        _: usize,
    ) -> StoreResult<Vec<String>> {
        down()
    }

    async fn range_by_score(
        &self,
        _: &StoreKey,
        _: f64,
        _: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        down()
    }

    async fn count_by_score(&self, _: &[StoreKey], _: f64, _: f64) -> StoreResult<Vec<u64>> {
        down()
    }

    async fn remove_member(&self, _: &StoreKey, _: &str) -> StoreResult<()> {
        down()
    }

    async fn add_to_set(&self, _: &StoreKey, _: &str) -> StoreResult<()> {
        down()
    }

    async fn remove_key(&self, _: &StoreKey) -> StoreResult<()> {
        down()
    }

    async fn commit(&self, _: Transaction) -> StoreResult<CommitOutcome> {
        down()
    }

    async fn ping(&self) -> StoreResult<()> {
        down()
    }
}
