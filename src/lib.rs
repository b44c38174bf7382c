//! tiercache - Tiered Cache Orchestration
//!
//! Unifies an in-process memory store and a networked redis store behind one
//! cache interface, adding TTL tracking that does not depend on the backend,
//! threshold-gated compression and promotion of entries found only in a
//! slower tier back into faster tiers.
//!
//! # Architecture
//!
//! ```text
//! caller ──▶ Cache ──▶ tier 0 (MemoryStore) ──▶ tier 1 (RedisStore) ──▶ ...
//!              │
//!              ├─ marshal (Json / Raw / FnCodec)
//!              ├─ compress (ThresholdCompressor: lz4 / zstd)
//!              └─ expiry header, written per tier
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tiercache::Cache;
//!
//! # async fn run() -> tiercache::Result<()> {
//! let cache = Cache::with_ttl(Duration::from_secs(60))?;
//! cache.set("user:1", &"tree", None).await?;
//! let name: String = cache.get("user:1").await?;
//! assert_eq!(name, "tree");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Tiered orchestrator, configuration and metrics
//! - [`codec`] - Expiry header and marshal strategies
//! - [`compression`] - Threshold compressor and codecs
//! - [`error`] - Error types
//! - [`redis`] - Lock, counter and session helpers on the networked store
//! - [`store`] - Store capability with memory and redis implementations

pub mod cache;
pub mod codec;
pub mod compression;
pub mod error;
pub mod redis;
pub mod store;

// Re-export commonly used types
pub use self::cache::{Cache, CacheConfig, CacheMetrics, CompressorConfig, MetricsSnapshot};
pub use self::codec::{FnCodec, Json, Marshaler, Raw, Ttl, Unmarshaler};
pub use self::compression::{CompressionAlgorithm, CompressionConfig, Compressor, ThresholdCompressor};
pub use self::error::{Error, Result};
pub use self::redis::{Done, RedisCache, RedisSession};
pub use self::store::{MemoryStore, MemoryStoreConfig, RedisStore, RedisStoreConfig, RemoveReason, Store};
