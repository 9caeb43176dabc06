/// Configuration management for Vote Service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Voting rules
    pub vote: VoteConfig,
    /// Ranked listing settings
    pub listing: ListingSettings,
    /// Vote archiver job
    pub archiver: ArchiverConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
    /// Prefix for every key the service owns
    pub key_prefix: String,
    /// Per-command timeout in milliseconds
    pub command_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteConfig {
    pub window_secs: i64,
    pub weight: f64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSettings {
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Lifetime of cached community intersections
    pub community_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiverConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl RedisConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env_or("PORT", 8090),
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
        };

        let redis = RedisConfig {
            url: std::env::var("REDIS_URL").context("REDIS_URL environment variable not set")?,
            key_prefix: std::env::var("REDIS_KEY_PREFIX")
                .unwrap_or_else(|_| "bluebell:".to_string()),
            command_timeout_ms: env_or("REDIS_COMMAND_TIMEOUT_MS", 3000),
        };

        let vote = VoteConfig {
            window_secs: env_or("VOTE_WINDOW_SECS", 604_800),
            weight: env_or("VOTE_WEIGHT", 432.0),
            max_retries: env_or("VOTE_MAX_RETRIES", 5),
        };

        let listing = ListingSettings {
            default_page_size: env_or("LIST_DEFAULT_PAGE_SIZE", 10),
            max_page_size: env_or("LIST_MAX_PAGE_SIZE", 100),
            community_cache_ttl_secs: env_or("COMMUNITY_CACHE_TTL_SECS", 60),
        };

        let archiver = ArchiverConfig {
            enabled: env_flag("VOTE_ARCHIVER_ENABLED", false),
            interval_secs: env_or("VOTE_ARCHIVER_INTERVAL_SECS", 3600),
        };

        Ok(Config {
            app,
            database,
            redis,
            vote,
            listing,
            archiver,
        })
    }
}
