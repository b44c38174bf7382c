//! Redis Session Store
//!
//! Byte-oriented session storage. A missing session reads back as empty
//! data instead of an error.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::store::{RedisStore, Store};

/// Prefixed session storage over a redis store
pub struct RedisSession {
    store: Arc<RedisStore>,
    prefix: String,
}

impl RedisSession {
    /// Create over an existing store
    pub fn new(store: Arc<RedisStore>) -> Self {
        Self {
            store,
            prefix: String::new(),
        }
    }

    /// Set the key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Key prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Session data, empty if the session does not exist
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        match self.store.get(&self.key(key)).await {
            Err(Error::NotFound) => Ok(Bytes::new()),
            other => other,
        }
    }

    /// Store session data for `ttl`
    pub async fn set(&self, key: &str, data: impl Into<Bytes>, ttl: Duration) -> Result<()> {
        self.store.set(&self.key(key), data.into(), ttl).await
    }

    /// Remove the session
    pub async fn destroy(&self, key: &str) -> Result<()> {
        self.store.delete(&self.key(key)).await
    }
}
