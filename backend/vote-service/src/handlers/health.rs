use crate::app_state::AppState;
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    redis: &'static str,
    latency_ms: u64,
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

/// Ready once the score store answers a ping.
pub async fn ready(state: web::Data<AppState>) -> impl Responder {
    let start = Instant::now();
    let result = state.store.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HttpResponse::Ok().json(ReadinessResponse {
            ready: true,
            redis: "healthy",
            latency_ms,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            HttpResponse::ServiceUnavailable().json(ReadinessResponse {
                ready: false,
                redis: "unhealthy",
                latency_ms,
            })
        }
    }
}
