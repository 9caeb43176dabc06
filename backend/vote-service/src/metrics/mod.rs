/// Prometheus metrics for vote-service
use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{Encoder, Registry, TextEncoder};

pub mod listing;
pub mod votes;

lazy_static! {
    /// Registry served on `/metrics`
    pub static ref REGISTRY: Registry = Registry::new();
}

/// Text exposition of everything registered in [`REGISTRY`].
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub async fn serve_metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(gather_metrics())
}
