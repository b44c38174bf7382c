//! Redis Store
//!
//! Networked tier over a multiplexed `redis::aio::ConnectionManager`.
//! Every command is bounded by a timeout so that a stalled server surfaces
//! `Error::Timeout` instead of hanging the caller.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use tracing::info;

use super::Store;
use crate::error::{Error, Result};

/// Default per-command timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(3);

/// Redis store configuration
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`
    pub url: String,
    /// Deadline applied to every command (and to the initial connect)
    pub command_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// Store backed by a redis server
pub struct RedisStore {
    conn: ConnectionManager,
    command_timeout: Duration,
    closed: AtomicBool,
}

impl RedisStore {
    /// Connect using the given configuration
    pub async fn connect(config: RedisStoreConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = match tokio::time::timeout(
            config.command_timeout,
            ConnectionManager::new(client),
        )
        .await
        {
            Ok(conn) => conn?,
            Err(_) => {
                return Err(Error::Timeout {
                    operation: "connect",
                    duration: config.command_timeout,
                })
            }
        };
        info!(url = %config.url, "Redis store connected");
        Ok(Self::from_connection(conn, config.command_timeout))
    }

    /// Wrap an existing connection manager
    pub fn from_connection(conn: ConnectionManager, command_timeout: Duration) -> Self {
        Self {
            conn,
            command_timeout,
            closed: AtomicBool::new(false),
        }
    }

    /// Per-command timeout
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Cloned handle to the shared connection, failing once closed
    pub(crate) fn connection(&self) -> Result<ConnectionManager> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StoreClosed);
        }
        Ok(self.conn.clone())
    }

    /// Run one command under the store's timeout
    pub(crate) async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout {
                operation,
                duration: self.command_timeout,
            }),
        }
    }
}

/// Largest `PX` value sent; redis rejects expiries that overflow its millisecond clock
pub(crate) const MAX_PX_MILLIS: u64 = (i64::MAX / 2) as u64;

/// Millisecond TTL for `PX`, between 1ms and [`MAX_PX_MILLIS`]
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_PX_MILLIS)
}

#[async_trait]
impl Store for RedisStore {
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.connection()?;
        if ttl.is_zero() {
            self.run("set", conn.set::<_, _, ()>(key, value.as_ref()))
                .await
        } else {
            self.run(
                "set",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value.as_ref())
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .query_async::<()>(&mut conn),
            )
            .await
        }
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let mut conn = self.connection()?;
        let value: Option<Vec<u8>> = self.run("get", conn.get(key)).await?;
        value.map(Bytes::from).ok_or(Error::NotFound)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection()?;
        self.run("delete", conn.del::<_, ()>(key)).await
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Redis store closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::MAX), MAX_PX_MILLIS);
        assert_eq!(
            ttl_millis(Duration::from_secs(530 * 365 * 24 * 3600)),
            530 * 365 * 24 * 3600 * 1000
        );
    }

    #[test]
    fn test_default_config() {
        let config = RedisStoreConfig::default();
        assert_eq!(config.command_timeout, DEFAULT_COMMAND_TIMEOUT);
        assert!(config.url.starts_with("redis://"));
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let result = RedisStore::connect(RedisStoreConfig {
            url: "not a url".to_string(),
            ..Default::default()
        })
        .await;
        assert!(matches!(result, Err(Error::Redis(_))));
    }
}
