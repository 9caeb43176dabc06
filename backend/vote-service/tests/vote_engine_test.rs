mod common;

use common::{ConflictingStore, RacingStore, UnavailableStore, CREATED_AT};
use std::sync::Arc;
use vote_service::models::VoteDirection::{self, Down, Retract, Up};
use vote_service::services::{VoteEngine, VoteEngineConfig, VoteError, VoteLedger};
use vote_service::store::{MemoryScoreStore, ScoreStore, StoreKey, Transaction};

async fn score(store: &dyn ScoreStore, post_id: &str) -> f64 {
    store
        .get_score(&StoreKey::PostScore, post_id)
        .await
        .unwrap()
        .unwrap()
}

async fn seeded(post_id: &str) -> (Arc<MemoryScoreStore>, VoteEngine) {
    let store = Arc::new(MemoryScoreStore::new());
    let engine = VoteEngine::new(store.clone(), VoteEngineConfig::default());
    engine.on_post_created_at(post_id, 3, CREATED_AT).await.unwrap();
    (store, engine)
}

#[tokio::test]
async fn two_voter_scenario_moves_score_and_ledger_in_step() {
    let (store, engine) = seeded("10").await;
    let ledger = VoteLedger::new(store.clone());
    let (a, b) = (1, 2);
    let now = CREATED_AT + 60;

    let steps: [(i64, VoteDirection, f64, VoteDirection, VoteDirection); 4] = [
        (a, Up, 432.0, Up, Retract),
        (b, Down, 0.0, Up, Down),
        (a, Down, -864.0, Down, Down),
        (a, Retract, -432.0, Retract, Down),
    ];
    for (voter, direction, expected_score, held_a, held_b) in steps {
        engine.cast_vote_at(voter, "10", direction, now).await.unwrap();
        assert_eq!(score(store.as_ref(), "10").await, expected_score);
        assert_eq!(ledger.current_vote("10", a).await.unwrap(), held_a);
        assert_eq!(ledger.current_vote("10", b).await.unwrap(), held_b);
    }

    let tally = ledger.tally("10").await.unwrap();
    assert_eq!((tally.up_votes, tally.down_votes), (0, 1));
}

#[tokio::test]
async fn score_tracks_weighted_sum_of_ledger() {
    let (store, engine) = seeded("500").await;
    let ledger = VoteLedger::new(store.clone());
    let now = CREATED_AT + 3600;

    let votes: [(i64, VoteDirection); 7] = [
        (1, Up),
        (2, Up),
        (3, Down),
        (1, Down),
        (4, Up),
        (2, Retract),
        (3, Up),
    ];
    for (voter, direction) in votes {
        engine.cast_vote_at(voter, "500", direction, now).await.unwrap();
    }

    // voter 1 down, 2 none, 3 up, 4 up
    let tally = ledger.tally("500").await.unwrap();
    assert_eq!((tally.up_votes, tally.down_votes), (2, 1));
    assert_eq!(score(store.as_ref(), "500").await, 432.0 * (2.0 - 1.0));
}

#[tokio::test]
async fn concurrent_voters_never_lose_updates() {
    let (store, engine) = seeded("500").await;
    let now = CREATED_AT + 60;

    let mut handles = Vec::new();
    for voter in 1..=40i64 {
        let engine = engine.clone();
        let direction = if voter % 4 == 0 { Down } else { Up };
        handles.push(tokio::spawn(async move {
            engine.cast_vote_at(voter, "500", direction, now).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 30 up, 10 down
    assert_eq!(score(store.as_ref(), "500").await, 432.0 * 20.0);
}

#[tokio::test]
async fn racing_vote_by_same_voter_is_retried_with_fresh_value() {
    let memory = Arc::new(MemoryScoreStore::new());
    let store = Arc::new(RacingStore::new(memory.clone()));
    let engine = VoteEngine::new(store.clone(), VoteEngineConfig::default());
    engine.on_post_created_at("500", 3, CREATED_AT).await.unwrap();
    engine.cast_vote_at(9, "500", Up, CREATED_AT).await.unwrap();
    assert_eq!(score(memory.as_ref(), "500").await, 432.0);

    // Another request by voter 9 retracts between our read and our commit.
    let mut racing = Transaction::new();
    racing
        .guard(StoreKey::post_voters("500"), "9", Some(1.0))
        .increment_score(StoreKey::PostScore, "500", -432.0)
        .remove_member(StoreKey::post_voters("500"), "9");
    store.interfere_with(racing);

    let receipt = engine.cast_vote_at(9, "500", Down, CREATED_AT).await.unwrap();

    assert_eq!(receipt.previous, Retract);
    assert_eq!(receipt.score_delta, -432.0);
    assert_eq!(score(memory.as_ref(), "500").await, -432.0);
    // first vote, conflicted attempt, retry
    assert_eq!(store.guarded_commits(), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_as_store_unavailable() {
    let memory = Arc::new(MemoryScoreStore::new());
    let store = Arc::new(ConflictingStore {
        inner: memory.clone(),
    });
    let engine = VoteEngine::new(
        store,
        VoteEngineConfig {
            max_retries: 3,
            ..VoteEngineConfig::default()
        },
    );
    engine.on_post_created_at("500", 3, CREATED_AT).await.unwrap();

    let err = engine.cast_vote_at(1, "500", Up, CREATED_AT).await.unwrap_err();
    assert!(matches!(err, VoteError::StoreUnavailable(_)));
    assert_eq!(score(memory.as_ref(), "500").await, 0.0);
}

#[tokio::test]
async fn store_outage_is_reported_not_swallowed() {
    let engine = VoteEngine::new(Arc::new(UnavailableStore), VoteEngineConfig::default());

    let err = engine.cast_vote(1, "500", Up).await.unwrap_err();
    assert!(matches!(err, VoteError::StoreUnavailable(_)));

    let err = engine.on_post_created("500", 3).await.unwrap_err();
    assert!(matches!(err, VoteError::StoreUnavailable(_)));
}

#[tokio::test]
async fn custom_weight_and_window() {
    let store = Arc::new(MemoryScoreStore::new());
    let engine = VoteEngine::new(
        store.clone(),
        VoteEngineConfig {
            window_secs: 60,
            weight: 10.0,
            max_retries: 5,
        },
    );
    engine.on_post_created_at("7", 1, CREATED_AT).await.unwrap();

    engine.cast_vote_at(1, "7", Down, CREATED_AT + 60).await.unwrap();
    assert_eq!(score(store.as_ref(), "7").await, -10.0);

    let err = engine.cast_vote_at(1, "7", Up, CREATED_AT + 61).await.unwrap_err();
    assert!(matches!(err, VoteError::VotingWindowExpired));
    assert_eq!(score(store.as_ref(), "7").await, -10.0);
}

#[tokio::test]
async fn post_creation_registers_community_membership() {
    let (store, engine) = seeded("500").await;
    engine.on_post_created_at("501", 4, CREATED_AT + 1).await.unwrap();

    let in_three = store
        .range_desc_within(&StoreKey::PostTime, &StoreKey::community(3), 0, 10)
        .await
        .unwrap();
    assert_eq!(in_three, vec!["500"]);
    assert_eq!(score(store.as_ref(), "501").await, 0.0);
}
