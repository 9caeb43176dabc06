use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use redis_utils::RedisPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vote_service::config::Config;
use vote_service::handlers::configure_routes;
use vote_service::jobs::vote_archiver::{start_vote_archiver, VoteArchiver};
use vote_service::services::{ListingConfig, PgPostStore, PostStore, VoteEngineConfig};
use vote_service::store::{RedisScoreStore, ScoreStore};
use vote_service::workers::redis_health;
use vote_service::AppState;

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,actix_web=info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting vote-service");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: env={}, http_port={}",
        config.app.env, config.app.http_port
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database pool created and migrations applied");

    let redis_pool = RedisPool::connect(&config.redis.url, config.redis.command_timeout())
        .await
        .context("Failed to connect to Redis")?;
    info!(
        addr = redis_pool.addr(),
        command_timeout_ms = redis_pool.command_timeout().as_millis() as u64,
        "Redis connection established"
    );

    let store: Arc<dyn ScoreStore> = Arc::new(RedisScoreStore::new(
        redis_pool,
        config.redis.key_prefix.clone(),
        config.listing.community_cache_ttl_secs,
    ));
    let posts: Arc<dyn PostStore> = Arc::new(PgPostStore::new(pg_pool.clone()));

    let state = AppState::new(
        store.clone(),
        posts.clone(),
        VoteEngineConfig {
            window_secs: config.vote.window_secs,
            weight: config.vote.weight,
            max_retries: config.vote.max_retries,
        },
        ListingConfig {
            default_page_size: config.listing.default_page_size,
            max_page_size: config.listing.max_page_size,
        },
    );

    let mut join_set: JoinSet<Result<()>> = JoinSet::new();

    let health_store = store.clone();
    join_set.spawn(async move {
        redis_health::start_redis_health_check(
            health_store,
            redis_health::RedisHealthConfig::default(),
        )
        .await;
        Ok(())
    });

    if config.archiver.enabled {
        let archiver = VoteArchiver::new(store.clone(), posts.clone(), config.vote.window_secs);
        let every = Duration::from_secs(config.archiver.interval_secs);
        join_set.spawn(async move {
            start_vote_archiver(archiver, every).await;
            Ok(())
        });
        info!(interval_secs = config.archiver.interval_secs, "Vote archiver enabled");
    }

    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    info!("HTTP server listening on http://{}", http_addr);

    let app_state = web::Data::new(state);
    let http_server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .disable_signals()
    .run();

    let server_handle = http_server.handle();
    join_set.spawn(async move {
        http_server
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))
    });

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        Some(result) = join_set.join_next() => {
            match result {
                Ok(Ok(())) => info!("Task completed"),
                Ok(Err(e)) => {
                    tracing::error!("Task failed: {:#}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("Task panicked: {:#}", e);
                    return Err(anyhow::anyhow!("Task panicked: {}", e));
                }
            }
        }
    }

    server_handle.stop(true).await;
    join_set.abort_all();
    pg_pool.close().await;

    info!("vote-service shut down");
    Ok(())
}
