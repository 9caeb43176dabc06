/// Ranked listing metrics
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_with_registry, HistogramVec,
    IntCounter,
};
use std::time::Instant;

use super::REGISTRY;

lazy_static! {
    /// Listing latency including hydration (labels: order=time|score)
    pub static ref POST_LIST_DURATION_SECONDS: HistogramVec = register_histogram_vec_with_registry!(
        "post_list_duration_seconds",
        "Ranked post listing duration in seconds",
        &["order"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
        REGISTRY
    )
    .unwrap();

    /// Indexed post IDs the relational store could not resolve
    pub static ref POST_HYDRATION_MISSES_TOTAL: IntCounter = register_int_counter_with_registry!(
        "post_hydration_misses_total",
        "Total post IDs dropped from listings because hydration found no row",
        REGISTRY
    )
    .unwrap();
}

pub fn observe_list_duration(order: &str, started: Instant) {
    POST_LIST_DURATION_SECONDS
        .with_label_values(&[order])
        .observe(started.elapsed().as_secs_f64());
}

pub fn record_hydration_misses(count: usize) {
    if count > 0 {
        POST_HYDRATION_MISSES_TOTAL.inc_by(count as u64);
    }
}
