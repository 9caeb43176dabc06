use super::{CommitOutcome, ScoreStore, StoreKey, StoreResult, Transaction, WriteOp};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{AsyncCommands, Pipeline, Script};
use redis_utils::RedisPool;
use tracing::debug;

/// Guarded commit evaluated server-side so the compare and the writes are one step.
///
/// KEYS[1] guard key, KEYS[2..] one key per op.
/// ARGV[1] guard member, ARGV[2] expected score ("" = must be absent),
/// then (op, member, score) per op.
static GUARDED_COMMIT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local current = redis.call('ZSCORE', KEYS[1], ARGV[1])
        if ARGV[2] == '' then
            if current then
                return 0
            end
        elseif (not current) or tonumber(current) ~= tonumber(ARGV[2]) then
            return 0
        end

        for i = 2, #KEYS do
            local base = 3 + (i - 2) * 3
            local op, member, score = ARGV[base], ARGV[base + 1], ARGV[base + 2]
            if op == 'zaddnx' then
                redis.call('ZADD', KEYS[i], 'NX', score, member)
            elseif op == 'zadd' then
                redis.call('ZADD', KEYS[i], score, member)
            elseif op == 'zincrby' then
                redis.call('ZINCRBY', KEYS[i], score, member)
            elseif op == 'zrem' then
                redis.call('ZREM', KEYS[i], member)
            elseif op == 'sadd' then
                redis.call('SADD', KEYS[i], member)
            end
        end
        return 1
        "#,
    )
});

/// Redis-backed [`ScoreStore`].
///
/// Community-scoped listings are served from a `ZINTERSTORE` result cached for
/// `community_cache_ttl_secs`, so a community page may lag the global indexes by that long.
#[derive(Clone)]
pub struct RedisScoreStore {
    pool: RedisPool,
    prefix: String,
    community_cache_ttl_secs: u64,
}

impl RedisScoreStore {
    pub fn new(pool: RedisPool, prefix: impl Into<String>, community_cache_ttl_secs: u64) -> Self {
        Self {
            pool,
            prefix: prefix.into(),
            community_cache_ttl_secs: community_cache_ttl_secs.max(1),
        }
    }

    fn key(&self, key: &StoreKey) -> String {
        key.render(&self.prefix)
    }

    fn intersection_key(&self, key: &StoreKey, set: &StoreKey) -> String {
        format!("{}cache:{}:{}", self.prefix, key.render(""), set.render(""))
    }

    fn queue_op(&self, pipe: &mut Pipeline, op: &WriteOp) {
        match op {
            WriteOp::SetIfAbsent { key, member, score } => {
                pipe.cmd("ZADD")
                    .arg(self.key(key))
                    .arg("NX")
                    .arg(*score)
                    .arg(member)
                    .ignore();
            }
            WriteOp::Set { key, member, score } => {
                pipe.cmd("ZADD").arg(self.key(key)).arg(*score).arg(member).ignore();
            }
            WriteOp::Increment { key, member, delta } => {
                pipe.cmd("ZINCRBY")
                    .arg(self.key(key))
                    .arg(*delta)
                    .arg(member)
                    .ignore();
            }
            WriteOp::Remove { key, member } => {
                pipe.cmd("ZREM").arg(self.key(key)).arg(member).ignore();
            }
            WriteOp::AddToSet { key, member } => {
                pipe.cmd("SADD").arg(self.key(key)).arg(member).ignore();
            }
        }
    }
}

/// Script op name, key, member and score argument for a write.
fn script_args(op: &WriteOp) -> (&'static str, &StoreKey, &str, String) {
    match op {
        WriteOp::SetIfAbsent { key, member, score } => {
            ("zaddnx", key, member.as_str(), score.to_string())
        }
        WriteOp::Set { key, member, score } => ("zadd", key, member.as_str(), score.to_string()),
        WriteOp::Increment { key, member, delta } => {
            ("zincrby", key, member.as_str(), delta.to_string())
        }
        WriteOp::Remove { key, member } => ("zrem", key, member.as_str(), String::new()),
        WriteOp::AddToSet { key, member } => ("sadd", key, member.as_str(), String::new()),
    }
}

/// Redis range bound; infinities use Redis' own spelling.
fn score_bound(value: f64) -> String {
    if value == f64::INFINITY {
        "+inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}

/// Inclusive ZREVRANGE ranks for a page. `None` when the page is empty or lies past
/// any rank Redis can address.
fn rank_bounds(offset: usize, limit: usize) -> Option<(isize, isize)> {
    let last = offset.checked_add(limit.checked_sub(1)?)?;
    Some((isize::try_from(offset).ok()?, isize::try_from(last).ok()?))
}

#[async_trait]
impl ScoreStore for RedisScoreStore {
    async fn set_if_absent(&self, key: &StoreKey, member: &str, score: f64) -> StoreResult<bool> {
        let mut conn = self.pool.connection();
        let added: i64 = self
            .pool
            .run(
                redis::cmd("ZADD")
                    .arg(self.key(key))
                    .arg("NX")
                    .arg(score)
                    .arg(member)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(added == 1)
    }

    async fn get_score(&self, key: &StoreKey, member: &str) -> StoreResult<Option<f64>> {
        let mut conn = self.pool.connection();
        let score: Option<f64> = self.pool.run(conn.zscore(self.key(key), member)).await?;
        Ok(score)
    }

    async fn get_scores(
        &self,
        key: &StoreKey,
        members: &[String],
    ) -> StoreResult<Vec<Option<f64>>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let redis_key = self.key(key);
        let mut pipe = redis::pipe();
        for member in members {
            pipe.cmd("ZSCORE").arg(&redis_key).arg(member);
        }

        let mut conn = self.pool.connection();
        let scores: Vec<Option<f64>> = self.pool.run(pipe.query_async(&mut conn)).await?;
        Ok(scores)
    }

    async fn range_desc(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        let Some((start, stop)) = rank_bounds(offset, limit) else {
            return Ok(Vec::new());
        };
        let mut conn = self.pool.connection();
        let members: Vec<String> = self
            .pool
            .run(conn.zrevrange(self.key(key), start, stop))
            .await?;
        Ok(members)
    }

    async fn range_desc_within(
        &self,
        key: &StoreKey,
        set: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        let Some((start, stop)) = rank_bounds(offset, limit) else {
            return Ok(Vec::new());
        };

        let dest = self.intersection_key(key, set);
        let mut conn = self.pool.connection();

        let cached: bool = self.pool.run(conn.exists(&dest)).await?;
        if !cached {
            // Set members weigh 0 so the stored score is exactly the index score.
            let mut pipe = redis::pipe();
            pipe.atomic()
                .cmd("ZINTERSTORE")
                .arg(&dest)
                .arg(2)
                .arg(self.key(key))
                .arg(self.key(set))
                .arg("WEIGHTS")
                .arg(1)
                .arg(0)
                .ignore()
                .cmd("EXPIRE")
                .arg(&dest)
                .arg(self.community_cache_ttl_secs)
                .ignore();
            let _: () = self.pool.run(pipe.query_async(&mut conn)).await?;
            debug!(dest = %dest, "rebuilt community intersection");
        }

        let members: Vec<String> = self.pool.run(conn.zrevrange(&dest, start, stop)).await?;
        Ok(members)
    }

    async fn range_by_score(
        &self,
        key: &StoreKey,
        min: f64,
        max: f64,
    ) -> StoreResult<Vec<(String, f64)>> {
        let mut conn = self.pool.connection();
        let entries: Vec<(String, f64)> = self
            .pool
            .run(conn.zrangebyscore_withscores(self.key(key), score_bound(min), score_bound(max)))
            .await?;
        Ok(entries)
    }

    async fn count_by_score(&self, keys: &[StoreKey], min: f64, max: f64) -> StoreResult<Vec<u64>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let (min, max) = (score_bound(min), score_bound(max));
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("ZCOUNT").arg(self.key(key)).arg(&min).arg(&max);
        }

        let mut conn = self.pool.connection();
        let counts: Vec<u64> = self.pool.run(pipe.query_async(&mut conn)).await?;
        Ok(counts)
    }

    async fn remove_member(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        let mut conn = self.pool.connection();
        let _: () = self.pool.run(conn.zrem(self.key(key), member)).await?;
        Ok(())
    }

    async fn add_to_set(&self, key: &StoreKey, member: &str) -> StoreResult<()> {
        let mut conn = self.pool.connection();
        let _: () = self.pool.run(conn.sadd(self.key(key), member)).await?;
        Ok(())
    }

    async fn remove_key(&self, key: &StoreKey) -> StoreResult<()> {
        let mut conn = self.pool.connection();
        let _: () = self.pool.run(conn.del(self.key(key))).await?;
        Ok(())
    }

    async fn commit(&self, tx: Transaction) -> StoreResult<CommitOutcome> {
        let (ops, guard) = tx.into_parts();
        if ops.is_empty() {
            return Ok(CommitOutcome::Applied);
        }

        let mut conn = self.pool.connection();

        let Some(guard) = guard else {
            let mut pipe = redis::pipe();
            pipe.atomic();
            for op in &ops {
                self.queue_op(&mut pipe, op);
            }
            let _: () = self.pool.run(pipe.query_async(&mut conn)).await?;
            return Ok(CommitOutcome::Applied);
        };

        let mut invocation = GUARDED_COMMIT.prepare_invoke();
        invocation
            .key(self.key(&guard.key))
            .arg(&guard.member)
            .arg(guard.expected.map(|v| v.to_string()).unwrap_or_default());
        for op in &ops {
            let (name, key, member, score) = script_args(op);
            invocation.key(self.key(key)).arg(name).arg(member).arg(score);
        }

        let applied: i64 = self.pool.run(invocation.invoke_async(&mut conn)).await?;
        if applied == 1 {
            Ok(CommitOutcome::Applied)
        } else {
            Ok(CommitOutcome::Conflict)
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        self.pool.ping().await?;
        Ok(())
    }
}
