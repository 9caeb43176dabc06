//! Runs against a real Redis. Set TEST_REDIS_URL and run with `--ignored`.

use redis_utils::RedisPool;
use std::sync::Arc;
use std::time::Duration;
use vote_service::models::VoteDirection;
use vote_service::services::{VoteEngine, VoteEngineConfig};
use vote_service::store::{CommitOutcome, RedisScoreStore, ScoreStore, StoreKey};

async fn redis_store() -> Option<RedisScoreStore> {
    let url = std::env::var("TEST_REDIS_URL").ok()?;
    let pool = RedisPool::connect(&url, Duration::from_secs(2)).await.ok()?;
    let prefix = format!(
        "vote-test:{}:{}:",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    Some(RedisScoreStore::new(pool, prefix, 60))
}

#[tokio::test]
#[ignore]
async fn redis_guarded_commit_and_ordering() {
    let Some(store) = redis_store().await else {
        eprintln!("TEST_REDIS_URL not set, skipping");
        return;
    };

    for (member, score) in [("a", 5.0), ("c", 5.0), ("b", 5.0), ("y", 9.0)] {
        assert!(store.set_if_absent(&StoreKey::PostScore, member, score).await.unwrap());
    }
    assert!(!store.set_if_absent(&StoreKey::PostScore, "a", 1.0).await.unwrap());
    assert_eq!(
        store.range_desc(&StoreKey::PostScore, 0, 10).await.unwrap(),
        vec!["y", "c", "b", "a"]
    );

    let voters = StoreKey::post_voters("a");
    let mut tx = store.begin_transaction();
    tx.guard(voters.clone(), "7", Some(1.0))
        .increment_score(StoreKey::PostScore, "a", 432.0);
    assert_eq!(store.commit(tx).await.unwrap(), CommitOutcome::Conflict);
    assert_eq!(
        store.get_score(&StoreKey::PostScore, "a").await.unwrap(),
        Some(5.0)
    );

    let mut tx = store.begin_transaction();
    tx.guard(voters.clone(), "7", None)
        .increment_score(StoreKey::PostScore, "a", 432.0)
        .set_score(voters.clone(), "7", 1.0);
    assert_eq!(store.commit(tx).await.unwrap(), CommitOutcome::Applied);
    assert_eq!(store.get_score(&voters, "7").await.unwrap(), Some(1.0));
    assert_eq!(
        store.count_by_score(&[voters.clone()], 1.0, 1.0).await.unwrap(),
        vec![1]
    );

    store.remove_key(&voters).await.unwrap();
    store.remove_key(&StoreKey::PostScore).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn redis_vote_flow_with_community() {
    let Some(store) = redis_store().await else {
        eprintln!("TEST_REDIS_URL not set, skipping");
        return;
    };
    let store = Arc::new(store);
    let engine = VoteEngine::new(store.clone(), VoteEngineConfig::default());
    let now = chrono::Utc::now().timestamp();

    engine.on_post_created_at("10", 1, now - 3).await.unwrap();
    engine.on_post_created_at("11", 2, now - 2).await.unwrap();
    engine.on_post_created_at("12", 1, now - 1).await.unwrap();

    engine.cast_vote_at(1, "10", VoteDirection::Up, now).await.unwrap();
    engine.cast_vote_at(1, "10", VoteDirection::Down, now).await.unwrap();
    assert_eq!(
        store.get_score(&StoreKey::PostScore, "10").await.unwrap(),
        Some(-432.0)
    );

    let ids = store
        .range_desc_within(&StoreKey::PostTime, &StoreKey::community(1), 0, 10)
        .await
        .unwrap();
    assert_eq!(ids, vec!["12", "10"]);

    let ids = store
        .range_desc_within(&StoreKey::PostScore, &StoreKey::community(1), 0, 10)
        .await
        .unwrap();
    assert_eq!(ids, vec!["12", "10"]);

    for key in [
        StoreKey::PostTime,
        StoreKey::PostScore,
        StoreKey::post_voters("10"),
        StoreKey::community(1),
        StoreKey::community(2),
    ] {
        store.remove_key(&key).await.unwrap();
    }
}
