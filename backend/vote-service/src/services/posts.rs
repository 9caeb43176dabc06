use crate::models::{PostRecord, VoteTally};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Relational post storage, as far as voting and listing need it.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Community a post was created in, `None` when the post does not exist.
    async fn post_community(&self, post_id: &str) -> Result<Option<i64>, PostStoreError>;

    /// One slot per requested ID, in request order; `None` where no row exists.
    async fn hydrate_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<Option<PostRecord>>, PostStoreError>;

    /// Persist the final tally of a post. Returns false when one was already stored.
    async fn archive_vote_tally(
        &self,
        post_id: &str,
        tally: VoteTally,
    ) -> Result<bool, PostStoreError>;

    /// Archived tallies in request order; `None` where the post was never archived.
    async fn archived_tallies(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<Option<VoteTally>>, PostStoreError>;
}

/// [`PostStore`] over the `post` table.
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn post_community(&self, post_id: &str) -> Result<Option<i64>, PostStoreError> {
        let Ok(post_id) = post_id.parse::<i64>() else {
            return Ok(None);
        };

        let community_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT community_id FROM post
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(community_id)
    }

    async fn hydrate_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<Option<PostRecord>>, PostStoreError> {
        let numeric: Vec<i64> = post_ids.iter().filter_map(|id| id.parse().ok()).collect();
        if numeric.is_empty() {
            return Ok(vec![None; post_ids.len()]);
        }

        let rows = sqlx::query_as::<_, PostRecord>(
            r#"
            SELECT post_id, author_id, community_id, status, title, content, create_time
            FROM post
            WHERE post_id = ANY($1)
            "#,
        )
        .bind(&numeric)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<i64, PostRecord> =
            rows.into_iter().map(|row| (row.post_id, row)).collect();

        Ok(post_ids
            .iter()
            .map(|id| id.parse::<i64>().ok().and_then(|id| by_id.remove(&id)))
            .collect())
    }

    async fn archive_vote_tally(
        &self,
        post_id: &str,
        tally: VoteTally,
    ) -> Result<bool, PostStoreError> {
        let Ok(post_id) = post_id.parse::<i64>() else {
            return Ok(false);
        };

        let result = sqlx::query(
            r#"
            INSERT INTO post_vote_tally (post_id, up_votes, down_votes)
            VALUES ($1, $2, $3)
            ON CONFLICT (post_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(tally.up_votes as i64)
        .bind(tally.down_votes as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn archived_tallies(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<Option<VoteTally>>, PostStoreError> {
        let numeric: Vec<i64> = post_ids.iter().filter_map(|id| id.parse().ok()).collect();
        if numeric.is_empty() {
            return Ok(vec![None; post_ids.len()]);
        }

        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT post_id, up_votes, down_votes
            FROM post_vote_tally
            WHERE post_id = ANY($1)
            "#,
        )
        .bind(&numeric)
        .fetch_all(&self.pool)
        .await?;

        let by_id: HashMap<i64, VoteTally> = rows
            .into_iter()
            .map(|(post_id, up, down)| {
                let tally = VoteTally {
                    up_votes: up.max(0) as u64,
                    down_votes: down.max(0) as u64,
                };
                (post_id, tally)
            })
            .collect();

        Ok(post_ids
            .iter()
            .map(|id| id.parse::<i64>().ok().and_then(|id| by_id.get(&id).copied()))
            .collect())
    }
}
