use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::{Client, ConnectionInfo, IntoConnectionInfo, RedisError};
use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Default per-command timeout applied by [`run_with_timeout`].
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Commands are never given less than this.
const MIN_COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

/// Process-wide Redis handle.
///
/// Wraps a multiplexed [`ConnectionManager`] (which reconnects on its own) together with
/// the command timeout every caller should apply. Cloning is cheap and shares the same
/// underlying connection, so one pool is built at startup and handed to each component.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
    command_timeout: Duration,
    addr_label: String,
}

impl RedisPool {
    pub async fn connect(redis_url: &str, command_timeout: Duration) -> Result<Self> {
        let info: ConnectionInfo = redis_url
            .into_connection_info()
            .context("failed to parse REDIS_URL connection string")?;
        let addr_label = info.addr.to_string();

        let client = Client::open(info).context("failed to construct Redis client")?;
        let manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        info!(addr = %addr_label, "Redis connection manager ready");

        Ok(Self {
            manager,
            command_timeout: command_timeout.max(MIN_COMMAND_TIMEOUT),
            addr_label,
        })
    }

    /// Connection handle for issuing commands. Clones share the multiplexed connection.
    pub fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub fn addr(&self) -> &str {
        &self.addr_label
    }

    /// Run a Redis future bounded by this pool's command timeout.
    pub async fn run<F, T>(&self, future: F) -> Result<T, RedisError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        run_with_timeout(self.command_timeout, future).await
    }

    pub async fn ping(&self) -> Result<(), RedisError> {
        let mut conn = self.connection();
        let pong: String = self
            .run(redis::cmd("PING").query_async(&mut conn))
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(RedisError::from((
                redis::ErrorKind::ResponseError,
                "unexpected PING reply",
                pong,
            )))
        }
    }
}

/// Bound a Redis future by `limit`; elapsing surfaces as an IO error so callers treat it
/// like any other connection failure.
pub async fn run_with_timeout<F, T>(limit: Duration, future: F) -> Result<T, RedisError>
where
    F: Future<Output = Result<T, RedisError>>,
{
    match timeout(limit, future).await {
        Ok(res) => res,
        Err(_) => Err(RedisError::from((
            redis::ErrorKind::IoError,
            "redis command timed out",
        ))),
    }
}
