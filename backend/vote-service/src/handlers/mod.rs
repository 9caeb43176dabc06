use crate::error::AppError;
use crate::metrics::serve_metrics;
use actix_web::web;

pub mod health;
pub mod posts;
pub mod vote;

/// Mount every route of the service.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidParam(err.to_string()).into()),
    )
    .route("/health", web::get().to(health::health))
    .route("/ready", web::get().to(health::ready))
    .route("/metrics", web::get().to(serve_metrics))
    .service(
        web::scope("/api/v1")
            .route("/vote", web::post().to(vote::cast_vote))
            .route("/posts2", web::get().to(posts::list_posts))
            .route("/posts2/ids", web::get().to(posts::list_post_ids)),
    )
    .service(
        web::scope("/internal/v1")
            .route("/posts/{post_id}/created", web::post().to(posts::post_created)),
    );
}
