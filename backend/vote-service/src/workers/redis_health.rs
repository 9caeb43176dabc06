//! Redis Connection Health Check Background Job
//!
//! Periodically pings the score store so stale connections are noticed (and the
//! connection manager reconnects) before a vote or listing request hits them.

use crate::store::ScoreStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// How often to ping Redis (every 60 seconds)
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Failures in a row before logging at error level
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Configuration for Redis health checks
#[derive(Clone)]
pub struct RedisHealthConfig {
    pub enabled: bool,
    pub initial_delay: Duration,
    pub check_interval: Duration,
}

impl Default for RedisHealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(10),
            check_interval: HEALTH_CHECK_INTERVAL,
        }
    }
}

/// Tracks consecutive ping failures and reports transitions.
#[derive(Debug, Default)]
pub struct HealthState {
    consecutive_failures: u32,
}

impl HealthState {
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    tracing::info!(
                        previous_failures = self.consecutive_failures,
                        "Redis connection recovered"
                    );
                }
                self.consecutive_failures = 0;
                tracing::debug!("Redis health check: OK");
            }
            Err(e) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    tracing::error!(
                        consecutive_failures = self.consecutive_failures,
                        error = %e,
                        "Redis health check: CRITICAL - multiple consecutive failures"
                    );
                } else {
                    tracing::warn!(
                        consecutive_failures = self.consecutive_failures,
                        error = %e,
                        "Redis health check: FAILED"
                    );
                }
            }
        }
    }
}

/// Start the Redis health check background job. Runs until the task is dropped.
pub async fn start_redis_health_check(store: Arc<dyn ScoreStore>, config: RedisHealthConfig) {
    if !config.enabled {
        tracing::info!("Redis health check disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.check_interval.as_secs(),
        "Starting Redis health check background job for vote-service"
    );

    sleep(config.initial_delay).await;

    let mut state = HealthState::default();
    loop {
        state.record(store.ping().await.map_err(|e| e.to_string()));
        sleep(config.check_interval).await;
    }
}
