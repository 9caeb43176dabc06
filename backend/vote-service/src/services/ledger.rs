use crate::models::{VoteDirection, VoteTally};
use crate::store::{ScoreStore, StoreError, StoreKey, StoreResult, Transaction};
use std::sync::Arc;

/// Per-post voter ledger: `post:voted:<post_id>` maps voter_id -> -1 / +1.
/// A missing entry is "never voted"; retracting removes the entry.
#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn ScoreStore>,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self { store }
    }

    pub async fn current_vote(&self, post_id: &str, voter_id: i64) -> StoreResult<VoteDirection> {
        let key = StoreKey::post_voters(post_id);
        let Some(score) = self.store.get_score(&key, &voter_id.to_string()).await? else {
            return Ok(VoteDirection::Retract);
        };

        match VoteDirection::from_score(score) {
            Some(direction) if direction != VoteDirection::Retract => Ok(direction),
            _ => Err(StoreError::Corrupt {
                key: key.render(""),
                detail: format!("voter {} holds {}", voter_id, score),
            }),
        }
    }

    /// Queue the ledger write that moves `voter_id` to `next`.
    pub fn stage(&self, tx: &mut Transaction, post_id: &str, voter_id: i64, next: VoteDirection) {
        let key = StoreKey::post_voters(post_id);
        match next {
            VoteDirection::Retract => {
                tx.remove_member(key, voter_id.to_string());
            }
            direction => {
                tx.set_score(key, voter_id.to_string(), direction.as_score());
            }
        }
    }

    pub async fn tally(&self, post_id: &str) -> StoreResult<VoteTally> {
        let tallies = self.tallies(&[post_id.to_string()]).await?;
        Ok(tallies.into_iter().next().unwrap_or_default())
    }

    /// Up/down counts for several posts, in input order.
    pub async fn tallies(&self, post_ids: &[String]) -> StoreResult<Vec<VoteTally>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<StoreKey> = post_ids.iter().map(|id| StoreKey::post_voters(id)).collect();
        let ups = self.store.count_by_score(&keys, 1.0, 1.0).await?;
        let downs = self.store.count_by_score(&keys, -1.0, -1.0).await?;

        Ok(ups
            .into_iter()
            .zip(downs)
            .map(|(up_votes, down_votes)| VoteTally {
                up_votes,
                down_votes,
            })
            .collect())
    }

    /// Drop the whole ledger of a post once its votes are frozen.
    pub async fn clear(&self, post_id: &str) -> StoreResult<()> {
        self.store.remove_key(&StoreKey::post_voters(post_id)).await
    }
}
