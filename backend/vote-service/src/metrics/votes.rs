/// Vote engine and vote archiver metrics
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_int_counter_with_registry, CounterVec,
    IntCounter,
};

use super::REGISTRY;

lazy_static! {
    /// Vote attempts (labels: outcome)
    /// outcome: accepted, duplicate, window_expired, not_found, store_error
    pub static ref VOTES_TOTAL: CounterVec = register_counter_vec_with_registry!(
        "votes_total",
        "Total vote attempts by outcome",
        &["outcome"],
        REGISTRY
    )
    .unwrap();

    /// Guarded commits rejected because the ledger moved underneath the vote
    pub static ref VOTE_CAS_CONFLICTS_TOTAL: IntCounter = register_int_counter_with_registry!(
        "vote_cas_conflicts_total",
        "Total vote commits retried after a ledger conflict",
        REGISTRY
    )
    .unwrap();

    /// Archiver passes (labels: status=success|failed)
    pub static ref VOTE_ARCHIVER_RUNS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        "vote_archiver_runs_total",
        "Total vote archiver runs",
        &["status"],
        REGISTRY
    )
    .unwrap();
}

pub fn record_vote(outcome: &str) {
    VOTES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_cas_conflict() {
    VOTE_CAS_CONFLICTS_TOTAL.inc();
}

pub fn record_archiver_run(success: bool) {
    let status = if success { "success" } else { "failed" };
    VOTE_ARCHIVER_RUNS_TOTAL.with_label_values(&[status]).inc();
}
