//! Redis Convenience Operations
//!
//! Helpers built directly on the networked store: a SET NX lock with a
//! release callback, a counter whose TTL is only set on first write, and
//! JSON struct helpers.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::cache::frame;
use crate::codec::{
    decode_expiry, expiry_after, remaining_ttl, Json, Marshaler, Ttl, Unmarshaler,
    EXPIRY_HEADER_SIZE,
};
use crate::error::{Error, Result};
use crate::store::redis::ttl_millis;
use crate::store::RedisStore;

pub mod session;

pub use session::RedisSession;

/// TTL used when neither the call nor the cache sets one
pub const DEFAULT_REDIS_TTL: Duration = Duration::from_secs(10 * 60);

/// Release callback returned by [`RedisCache::lock_with_done`]
pub type Done = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// A `Done` that does nothing
pub fn noop_done() -> Done {
    Box::new(|| async { Ok::<_, Error>(()) }.boxed())
}

/// Prefixed redis helpers with a default TTL
pub struct RedisCache {
    store: Arc<RedisStore>,
    prefix: String,
    ttl: Duration,
}

impl RedisCache {
    /// Create over an existing store
    pub fn new(store: Arc<RedisStore>) -> Self {
        Self {
            store,
            prefix: String::new(),
            ttl: DEFAULT_REDIS_TTL,
        }
    }

    /// Set the key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the default TTL (zero = 10 minutes)
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = if ttl.is_zero() { DEFAULT_REDIS_TTL } else { ttl };
        self
    }

    /// Default TTL
    pub fn default_ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_or_default(&self, ttl: Option<Duration>) -> Duration {
        ttl.filter(|d| !d.is_zero()).unwrap_or(self.ttl)
    }

    fn key(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::KeyIsNil);
        }
        Ok(format!("{}{}", self.prefix, key))
    }

    // =========================================================================
    // Lock
    // =========================================================================

    async fn lock_key(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.store.connection()?;
        let reply: Option<String> = self
            .store
            .run(
                "lock",
                redis::cmd("SET")
                    .arg(key)
                    .arg(1)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(reply.is_some())
    }

    /// Lock `key` for `ttl`; true if this call acquired it
    pub async fn lock(&self, key: &str, ttl: Option<Duration>) -> Result<bool> {
        let key = self.key(key)?;
        self.lock_key(&key, self.ttl_or_default(ttl)).await
    }

    /// Lock `key` and return a callback that releases it.
    ///
    /// When the lock is not acquired the callback does nothing.
    pub async fn lock_with_done(&self, key: &str, ttl: Option<Duration>) -> Result<(bool, Done)> {
        let key = self.key(key)?;
        if !self.lock_key(&key, self.ttl_or_default(ttl)).await? {
            return Ok((false, noop_done()));
        }

        let store = Arc::clone(&self.store);
        let done: Done = Box::new(move || {
            async move {
                del_key(&store, &key).await?;
                debug!(key = %key, "Lock released");
                Ok::<_, Error>(())
            }
            .boxed()
        });
        Ok((true, done))
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Delete `key`, returning the number of keys removed
    pub async fn del(&self, key: &str) -> Result<i64> {
        let key = self.key(key)?;
        del_key(&self.store, &key).await
    }

    /// Add `value` (may be negative) to the counter at `key`.
    ///
    /// The TTL is applied only when the counter is created.
    pub async fn inc_with(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<i64> {
        let key = self.key(key)?;
        let ttl = self.ttl_or_default(ttl);
        let mut conn = self.store.connection()?;

        let (count,): (i64,) = self
            .store
            .run(
                "inc_with",
                redis::pipe()
                    .atomic()
                    .cmd("SET")
                    .arg(&key)
                    .arg(0)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .ignore()
                    .cmd("INCRBY")
                    .arg(&key)
                    .arg(value)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(count)
    }

    /// Remaining redis TTL of `key`, `None` when the key has no expiry
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let key = self.key(key)?;
        let mut conn = self.store.connection()?;
        let millis: i64 = self
            .store
            .run("ttl", redis::cmd("PTTL").arg(&key).query_async(&mut conn))
            .await?;
        match millis {
            -2 => Err(Error::NotFound),
            ms if ms < 0 => Ok(None),
            ms => Ok(Some(Duration::from_millis(ms as u64))),
        }
    }

    // =========================================================================
    // Bytes
    // =========================================================================

    async fn get_key(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.store.connection()?;
        let value: Option<Vec<u8>> = self
            .store
            .run("get", redis::cmd("GET").arg(key).query_async(&mut conn))
            .await?;
        Ok(value.map(Bytes::from))
    }

    async fn set_key(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = self.store.connection()?;
        self.store
            .run(
                "set",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(ttl_millis(ttl))
                    .query_async::<()>(&mut conn),
            )
            .await
    }

    /// Get the value of `key`, `Error::NotFound` if absent
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let key = self.key(key)?;
        self.get_key(&key).await?.ok_or(Error::NotFound)
    }

    /// Get the value of `key`, `None` if absent
    pub async fn get_ignore_nil(&self, key: &str) -> Result<Option<Bytes>> {
        let key = self.key(key)?;
        self.get_key(&key).await
    }

    /// Get the value of `key` and delete it in one transaction
    pub async fn get_and_del(&self, key: &str) -> Result<Bytes> {
        let key = self.key(key)?;
        let mut conn = self.store.connection()?;
        let (value,): (Option<Vec<u8>>,) = self
            .store
            .run(
                "get_and_del",
                redis::pipe()
                    .atomic()
                    .cmd("GET")
                    .arg(&key)
                    .cmd("DEL")
                    .arg(&key)
                    .ignore()
                    .query_async(&mut conn),
            )
            .await?;
        value.map(Bytes::from).ok_or(Error::NotFound)
    }

    /// Set `key` to `value`
    pub async fn set(&self, key: &str, value: impl AsRef<[u8]>, ttl: Option<Duration>) -> Result<()> {
        let key = self.key(key)?;
        self.set_key(&key, value.as_ref(), self.ttl_or_default(ttl)).await
    }

    // =========================================================================
    // Structs
    // =========================================================================

    /// Get `key` and unmarshal it from JSON
    pub async fn get_struct<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let data = self.get(key).await?;
        Json.unmarshal(&data)
    }

    /// Get `key` as JSON and return a callback that deletes it
    pub async fn get_struct_with_done<T: DeserializeOwned>(&self, key: &str) -> Result<(T, Done)> {
        let value = self.get_struct(key).await?;
        let key = self.key(key)?;
        let store = Arc::clone(&self.store);
        let done: Done =
            Box::new(move || async move { del_key(&store, &key).await.map(|_| ()) }.boxed());
        Ok((value, done))
    }

    /// Marshal `value` as JSON and set it
    pub async fn set_struct<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self.key(key)?;
        let data = Json.marshal(value)?;
        self.set_key(&key, &data, self.ttl_or_default(ttl)).await
    }

    /// Marshal `value` as JSON behind an expiry header and set it
    pub async fn set_struct_with_ttl<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self.key(key)?;
        let ttl = self.ttl_or_default(Some(ttl));
        let data = Json.marshal(value)?;
        let entry = frame(expiry_after(SystemTime::now(), ttl), &data);
        self.set_key(&key, &entry, ttl).await
    }

    /// Get a value written by [`set_struct_with_ttl`](Self::set_struct_with_ttl)
    /// together with the TTL from its header.
    ///
    /// An entry whose header has already expired is `Error::IsNil`, even while
    /// redis still holds it. An entry shorter than the header is `Error::Marshal`.
    pub async fn get_struct_and_ttl<T: DeserializeOwned>(&self, key: &str) -> Result<(T, Ttl)> {
        let raw = self.get(key).await?;
        if raw.len() < EXPIRY_HEADER_SIZE {
            return Err(Error::Marshal(format!(
                "entry of {} bytes is shorter than the expiry header",
                raw.len()
            )));
        }
        let value = Json.unmarshal(&raw[EXPIRY_HEADER_SIZE..])?;
        let ttl = remaining_ttl(decode_expiry(&raw), SystemTime::now()).ok_or(Error::IsNil)?;
        Ok((value, ttl))
    }
}

async fn del_key(store: &RedisStore, key: &str) -> Result<i64> {
    let mut conn = store.connection()?;
    store
        .run("del", redis::cmd("DEL").arg(key).query_async(&mut conn))
        .await
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_done() {
        let done = noop_done();
        assert!(done().await.is_ok());
    }

    #[test]
    fn test_default_ttl_constant() {
        assert_eq!(DEFAULT_REDIS_TTL, Duration::from_secs(600));
    }
}
