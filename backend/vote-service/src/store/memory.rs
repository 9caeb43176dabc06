use super::{CommitOutcome, ScoreStore, StoreError, StoreKey, StoreResult, Transaction, WriteOp};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    sorted: HashMap<StoreKey, HashMap<String, f64>>,
    sets: HashMap<StoreKey, HashSet<String>>,
}

impl MemoryState {
    fn score(&self, key: &StoreKey, member: &str) -> Option<f64> {
        self.sorted.get(key).and_then(|entries| entries.get(member).copied())
    }

    /// Entries by descending score, ties by descending member.
    fn sorted_desc(&self, key: &StoreKey) -> Vec<(&String, f64)> {
        let mut entries: Vec<(&String, f64)> = self
            .sorted
            .get(key)
            .map(|entries| entries.iter().map(|(m, s)| (m, *s)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.cmp(a.0))
        });
        entries
    }

    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::SetIfAbsent { key, member, score } => {
                self.sorted.entry(key).or_default().entry(member).or_insert(score);
            }
            WriteOp::Set { key, member, score } => {
                self.sorted.entry(key).or_default().insert(member, score);
            }
            WriteOp::Increment { key, member, delta } => {
                *self.sorted.entry(key).or_default().entry(member).or_insert(0.0) += delta;
            }
            WriteOp::Remove { key, member } => {
                if let Some(entries) = self.sorted.get_mut(&key) {
                    entries.remove(&member);
                    if entries.is_empty() {
                        self.sorted.remove(&key);
                    }
                }
            }
            WriteOp::AddToSet { key, member } => {
                self.sets.entry(key).or_default().insert(member);
            }
        }
    }
}

/// In-process [`ScoreStore`] with the same ordering and atomicity as the Redis backend.
/// Every commit runs inside one critical section.
#[derive(Default)]
pub struct MemoryScoreStore {
    state: Mutex<MemoryState>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn set_if_absent(&self, key: &StoreKey, member: &str, score: f64) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let entries = state.sorted.entry(key.clone()).or_default();
        if entries.contains_key(member) {
            return Ok(false);
        }
        entries.insert(member.to_string(), score);
        Ok(true)
    }

    async fn get_score(&self, key: &StoreKey, member: &str) -> StoreResult<Option<f64>> {
        Ok(self.lock()?.score(key, member))
    }

    async fn get_scores(
        &self,
        key: &StoreKey,
        members: &[String],
    ) -> StoreResult<Vec<Option<f64>>> {
        let state = self.lock()?;
        Ok(members.iter().map(|m| state.score(key, m)).collect())
    }

    async fn range_desc(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .sorted_desc(key)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn range_desc_within(
        &self,
        key: &StoreKey,
        set: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        let state = self.lock()?;
        let Some(members) = state.sets.get(set) else {
            return Ok(Vec::new());
        };
        Ok(state
            .sorted_desc(key)
            .into_iter()
            .filter(|(m, _)| members.contains(*m))
            .skip(offset)
            .take(limit)
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn range_by_score(
        &self,
        key: &StoreKey,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        let state = self.lock()?;
        let mut entries: Vec<(String, f64)> = state
            .sorted_desc(key)
            .into_iter()
            .filter(|(_, s)| *s >= min && *s <= max)
            .map(|(m, s)| (m.clone(), s))
            .collect();
        entries.reverse();
        Ok(entries)
    }

    async fn count_by_score(&self, keys: &[StoreKey], min: f64, max: f64) -> StoreResult<Vec<u64>> {
        let state = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| {
                state
                    .sorted
                    .get(key)
                    .map(|entries| entries.values().filter(|s| **s >= min && **s <= max).count())
                    .unwrap_or(0) as u64
            })
            .collect())
    }

    async fn remove_member(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        self.lock()?.apply(WriteOp::Remove {
            key: key.clone(),
            member: member.to_string(),
        });
        Ok(())
    }

    async fn add_to_set(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        self.lock()?.apply(WriteOp::AddToSet {
            key: key.clone(),
            member: member.to_string(),
        });
        Ok(())
    }

    async fn remove_key(&self, key: &StoreKey) -> StoreResult<()> {
        let mut state = self.lock()?;
        state.sorted.remove(key);
        state.sets.remove(key);
        Ok(())
    }

    async fn commit(&self, tx: Transaction) -> StoreResult<CommitOutcome> {
        let (ops, guard) = tx.into_parts();
        let mut state = self.lock()?;

        if let Some(guard) = guard {
            if !guard.holds(state.score(&guard.key, &guard.member)) {
                return Ok(CommitOutcome::Conflict);
            }
        }

        for op in ops {
            state.apply(op);
        }
        Ok(CommitOutcome::Applied)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }
}
