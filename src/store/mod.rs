//! Store Capability
//!
//! A tier is anything that can set, get, delete and close byte entries under
//! a string key. The orchestrator never looks inside a store; it holds tiers
//! as `Arc<dyn Store>` and sequences calls across them.
//!
//! # Implementations
//!
//! - [`MemoryStore`]: sharded in-process store, the default tier 0
//! - [`RedisStore`]: networked store shared between processes

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

pub mod memory;
pub mod redis;

pub use self::memory::{MemoryStore, MemoryStoreConfig, RemoveCallback, RemoveReason};
pub use self::redis::{RedisStore, RedisStoreConfig};

/// Backing store for one cache tier
#[async_trait]
pub trait Store: Send + Sync {
    /// Write `value` under `key`. A zero `ttl` leaves expiry to the store's own policy.
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Read the value under `key`, failing with `Error::NotFound` if absent or expired
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Remove `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Release the store's resources
    async fn close(&self) -> Result<()>;

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "store"
    }
}
