//! Tiered Cache Orchestrator
//!
//! Sequences reads and writes across an ordered list of stores
//! (tier 0 = fastest) with the expiry tracked inline in every entry.
//!
//! # Entry Layout
//!
//! Each tier receives `[expiry: 8 bytes BE nanos][tag: 1 byte][payload]`,
//! with an expiry computed from that tier's own TTL.
//!
//! # Reads
//!
//! - Tiers are consulted in order; the first entry whose inline expiry has
//!   not passed wins, regardless of what the store itself still holds
//! - A failing tier that is not the last one is skipped
//! - A hit at tier `w > 0` is written back into every tier before it with
//!   `min(remaining, tier_ttl)`; failures to do so are logged and ignored

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::codec::{
    decode_expiry, encode_expiry, expiry_after, remaining_ttl, Json, Marshaler, Raw, Ttl,
    Unmarshaler, EXPIRY_HEADER_SIZE,
};
use crate::compression::{decode_tagged, encode_passthrough, Compressor};
use crate::error::{Error, Result};
use crate::store::Store;

pub mod config;
pub mod metrics;

pub use config::{CacheConfig, CompressorConfig, DEFAULT_TTL};
pub use metrics::{CacheMetrics, MetricsSnapshot, TierSnapshot};

/// Decoded view of a raw entry header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Inline expiry (None = no expiry tracked)
    pub expiry: Option<SystemTime>,
    /// Compression tag, None for an entry without payload
    pub tag: Option<u8>,
    /// Payload length after the tag byte
    pub payload_len: usize,
}

impl EntryInfo {
    /// Parse a raw entry, `None` if it is shorter than the expiry header
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() < EXPIRY_HEADER_SIZE {
            return None;
        }
        let body = &raw[EXPIRY_HEADER_SIZE..];
        Some(Self {
            expiry: decode_expiry(raw),
            tag: body.first().copied(),
            payload_len: body.len().saturating_sub(1),
        })
    }
}

/// Per-tier result of [`Cache::inspect`]
#[derive(Debug)]
pub struct TierEntry {
    /// Tier index
    pub tier: usize,
    /// Store name
    pub store: &'static str,
    /// Raw entry read from the tier
    pub entry: Result<Option<EntryInfo>>,
}

/// Tiered cache
pub struct Cache {
    tiers: Vec<Arc<dyn Store>>,
    ttls: Vec<Duration>,
    key_prefix: String,
    compressor: Option<Arc<dyn Compressor>>,
    metrics: Arc<CacheMetrics>,
}

impl Cache {
    /// Create a cache from configuration
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let tiers = config.resolved_tiers();
        let ttls = config.resolved_ttls();
        let compressor = config.compressor.build();

        info!(
            tiers = tiers.len(),
            stores = ?tiers.iter().map(|t| t.name()).collect::<Vec<_>>(),
            ttls = ?ttls,
            key_prefix = %config.key_prefix,
            compression = compressor.is_some(),
            "Cache created"
        );

        Ok(Self {
            metrics: Arc::new(CacheMetrics::new(tiers.len())),
            tiers,
            ttls,
            key_prefix: config.key_prefix,
            compressor,
        })
    }

    /// Create a single-tier in-memory cache with the given default TTL
    pub fn with_ttl(ttl: Duration) -> Result<Self> {
        Self::new(CacheConfig::with_ttl(ttl))
    }

    /// Configured TTL of tier `index`; tiers past the list reuse the last entry
    pub fn tier_ttl(&self, index: usize) -> Duration {
        self.ttls
            .get(index)
            .or_else(|| self.ttls.last())
            .copied()
            .unwrap_or(DEFAULT_TTL)
    }

    /// Ordered tiers, index 0 = fastest
    pub fn tiers(&self) -> &[Arc<dyn Store>] {
        &self.tiers
    }

    /// Key prefix
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Metrics collector
    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Configured compressor, if any
    pub fn compressor(&self) -> Option<&dyn Compressor> {
        self.compressor.as_deref()
    }

    /// Effective store key, rejecting an empty caller key
    pub fn store_key(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::KeyIsNil);
        }
        Ok(format!("{}{}", self.key_prefix, key))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Marshal `value` as JSON and write it to every tier
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_with(key, value, &Json, ttl).await
    }

    /// Marshal `value` with `marshaler` and write it to every tier
    pub async fn set_with<T, M>(
        &self,
        key: &str,
        value: &T,
        marshaler: &M,
        ttl: Option<Duration>,
    ) -> Result<()>
    where
        T: ?Sized,
        M: Marshaler<T> + ?Sized,
    {
        let store_key = self.store_key(key)?;
        let data = marshaler.marshal(value)?;
        self.write_tiers(&store_key, &data, ttl).await
    }

    /// Write raw bytes to every tier
    pub async fn set_bytes(
        &self,
        key: &str,
        value: impl AsRef<[u8]>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let store_key = self.store_key(key)?;
        self.write_tiers(&store_key, value.as_ref(), ttl).await
    }

    async fn write_tiers(&self, store_key: &str, data: &[u8], ttl: Option<Duration>) -> Result<()> {
        let payload = self.encode(data)?;
        let now = SystemTime::now();
        let override_ttl = ttl.filter(|d| !d.is_zero());

        for (index, tier) in self.tiers.iter().enumerate() {
            let tier_ttl = override_ttl.unwrap_or_else(|| self.tier_ttl(index));
            let entry = frame(expiry_after(now, tier_ttl), &payload);
            if let Err(err) = tier.set(store_key, entry, tier_ttl).await {
                self.metrics.record_set(false);
                return Err(err);
            }
        }

        self.metrics.record_set(true);
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read and unmarshal a JSON value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_with(key, &Json).await
    }

    /// Read and unmarshal a value with `unmarshaler`
    pub async fn get_with<T, U>(&self, key: &str, unmarshaler: &U) -> Result<T>
    where
        U: Unmarshaler<T> + ?Sized,
    {
        Ok(self.get_with_and_ttl(key, unmarshaler).await?.0)
    }

    /// Read raw bytes
    pub async fn get_bytes(&self, key: &str) -> Result<Bytes> {
        self.get_with(key, &Raw).await
    }

    /// Read a JSON value together with its remaining TTL
    pub async fn get_and_ttl<T: DeserializeOwned>(&self, key: &str) -> Result<(T, Ttl)> {
        self.get_with_and_ttl(key, &Json).await
    }

    /// Read raw bytes together with their remaining TTL
    pub async fn get_bytes_and_ttl(&self, key: &str) -> Result<(Bytes, Ttl)> {
        self.get_with_and_ttl(key, &Raw).await
    }

    /// Read a value with `unmarshaler` together with its remaining TTL
    pub async fn get_with_and_ttl<T, U>(&self, key: &str, unmarshaler: &U) -> Result<(T, Ttl)>
    where
        U: Unmarshaler<T> + ?Sized,
    {
        let (data, ttl) = self.read_tiers(key).await?;
        Ok((unmarshaler.unmarshal(&data)?, ttl))
    }

    async fn read_tiers(&self, key: &str) -> Result<(Vec<u8>, Ttl)> {
        let store_key = self.store_key(key)?;
        let last = self.tiers.len().saturating_sub(1);

        for (index, tier) in self.tiers.iter().enumerate() {
            let start = Instant::now();
            let raw = match tier.get(&store_key).await {
                Ok(raw) => raw,
                Err(Error::NotFound) => {
                    self.metrics.record_miss(index);
                    debug!(key = %store_key, tier = index, "Tier miss");
                    continue;
                }
                Err(err) if index == last => {
                    self.metrics.record_read_error(index);
                    return Err(err);
                }
                Err(err) => {
                    self.metrics.record_read_error(index);
                    warn!(
                        key = %store_key,
                        tier = index,
                        store = tier.name(),
                        error = %err,
                        "Tier read failed, trying next tier"
                    );
                    continue;
                }
            };
            self.metrics.record_read_latency(index, start.elapsed());

            if raw.len() < EXPIRY_HEADER_SIZE {
                self.metrics.record_miss(index);
                debug!(key = %store_key, tier = index, len = raw.len(), "Entry shorter than expiry header");
                continue;
            }

            let now = SystemTime::now();
            let Some(ttl) = remaining_ttl(decode_expiry(&raw), now) else {
                self.metrics.record_expired(index);
                debug!(key = %store_key, tier = index, "Entry expired");
                continue;
            };

            self.metrics.record_hit(index);
            let payload = &raw[EXPIRY_HEADER_SIZE..];
            if index > 0 {
                self.promote(&store_key, payload, ttl, index, now).await;
            }

            let data = decode_tagged(self.compressor(), payload)?;
            return Ok((data, ttl));
        }

        self.metrics.record_nil();
        Err(Error::IsNil)
    }

    /// Write a hit from tier `found` back into every earlier tier
    async fn promote(&self, store_key: &str, payload: &[u8], ttl: Ttl, found: usize, now: SystemTime) {
        for (index, tier) in self.tiers[..found].iter().enumerate() {
            let tier_ttl = ttl.clamp_to(self.tier_ttl(index));
            let entry = frame(expiry_after(now, tier_ttl), payload);
            match tier.set(store_key, entry, tier_ttl).await {
                Ok(()) => {
                    self.metrics.record_promotion(index);
                    debug!(key = %store_key, from = found, to = index, ttl = ?tier_ttl, "Entry promoted");
                }
                Err(err) => {
                    self.metrics.record_promotion_failure(index);
                    warn!(
                        key = %store_key,
                        from = found,
                        to = index,
                        error = %err,
                        "Promotion failed"
                    );
                }
            }
        }
    }

    // =========================================================================
    // Delete / Close
    // =========================================================================

    /// Delete `key` from every tier, returning the last failure
    pub async fn delete(&self, key: &str) -> Result<()> {
        let store_key = self.store_key(key)?;
        let mut last_err = None;

        for (index, tier) in self.tiers.iter().enumerate() {
            if let Err(err) = tier.delete(&store_key).await {
                warn!(key = %store_key, tier = index, error = %err, "Tier delete failed");
                last_err = Some(err);
            }
        }

        self.metrics.record_delete(last_err.is_none());
        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Close every tier in order, stopping at the first failure
    pub async fn close(&self) -> Result<()> {
        for tier in &self.tiers {
            tier.close().await?;
        }
        info!("Cache closed");
        Ok(())
    }

    /// Raw entry header of `key` at every tier
    pub async fn inspect(&self, key: &str) -> Result<Vec<TierEntry>> {
        let store_key = self.store_key(key)?;
        let mut entries = Vec::with_capacity(self.tiers.len());

        for (index, tier) in self.tiers.iter().enumerate() {
            let entry = match tier.get(&store_key).await {
                Ok(raw) => Ok(EntryInfo::parse(&raw)),
                Err(Error::NotFound) => Ok(None),
                Err(err) => Err(err),
            };
            entries.push(TierEntry {
                tier: index,
                store: tier.name(),
                entry,
            });
        }

        Ok(entries)
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match &self.compressor {
            Some(compressor) => compressor.encode(data),
            None => Ok(encode_passthrough(data)),
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("tiers", &self.tiers.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("ttls", &self.ttls)
            .field("key_prefix", &self.key_prefix)
            .field("compression", &self.compressor.is_some())
            .finish()
    }
}

/// Build an entry with the given expiry ahead of `payload`
pub fn frame(expiry: SystemTime, payload: &[u8]) -> Bytes {
    let mut buf = vec![0u8; EXPIRY_HEADER_SIZE + payload.len()];
    encode_expiry(expiry, &mut buf);
    buf[EXPIRY_HEADER_SIZE..].copy_from_slice(payload);
    Bytes::from(buf)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{CompressionAlgorithm, CompressionConfig, COMPRESSED, NOT_COMPRESSED};
    use crate::store::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    fn profile() -> Profile {
        Profile {
            name: "tree.xie".into(),
            age: 18,
        }
    }

    fn two_tier(ttl0: Duration, ttl1: Duration) -> (Cache, Arc<MemoryStore>, Arc<MemoryStore>) {
        let tier0 = Arc::new(MemoryStore::new());
        let tier1 = Arc::new(MemoryStore::new());
        let cache = Cache::new(CacheConfig {
            ttls: vec![ttl0, ttl1],
            tiers: vec![tier0.clone() as Arc<dyn Store>, tier1.clone()],
            ..Default::default()
        })
        .unwrap();
        (cache, tier0, tier1)
    }

    async fn raw_expiry(store: &MemoryStore, key: &str) -> SystemTime {
        let raw = store.get(key).await.unwrap();
        decode_expiry(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = Cache::with_ttl(Duration::from_secs(10)).unwrap();

        cache.set("profile", &profile(), None).await.unwrap();
        let value: Profile = cache.get("profile").await.unwrap();
        assert_eq!(value, profile());

        let (value, ttl) = cache.get_and_ttl::<Profile>("profile").await.unwrap();
        assert_eq!(value, profile());
        let remaining = ttl.as_duration().unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining > Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let cache = Cache::with_ttl(Duration::from_secs(1)).unwrap();

        assert!(matches!(cache.set("", &1, None).await, Err(Error::KeyIsNil)));
        assert!(matches!(cache.set_bytes("", b"v", None).await, Err(Error::KeyIsNil)));
        assert!(matches!(cache.get::<u32>("").await, Err(Error::KeyIsNil)));
        assert!(matches!(cache.get_bytes("").await, Err(Error::KeyIsNil)));
        assert!(matches!(cache.delete("").await, Err(Error::KeyIsNil)));
        assert!(matches!(cache.inspect("").await, Err(Error::KeyIsNil)));
    }

    #[tokio::test]
    async fn test_missing_key_is_nil() {
        let cache = Cache::with_ttl(Duration::from_secs(1)).unwrap();
        let err = cache.get_bytes("missing").await.unwrap_err();
        assert!(matches!(err, Error::IsNil));
        assert_eq!(cache.metrics().nil_results(), 1);
    }

    #[test]
    fn test_tier_ttl_reuses_last() {
        let (cache, _, _) = two_tier(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(cache.tier_ttl(0), Duration::from_secs(1));
        assert_eq!(cache.tier_ttl(1), Duration::from_secs(10));
        assert_eq!(cache.tier_ttl(7), Duration::from_secs(10));

        let single = Cache::with_ttl(Duration::from_secs(3)).unwrap();
        assert_eq!(single.tier_ttl(0), Duration::from_secs(3));
        assert_eq!(single.tier_ttl(1), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_each_tier_gets_its_own_expiry() {
        let (cache, tier0, tier1) = two_tier(Duration::from_secs(1), Duration::from_secs(10));
        let before = SystemTime::now();

        cache.set_bytes("k", b"v", None).await.unwrap();

        let expiry0 = raw_expiry(&tier0, "k").await;
        let expiry1 = raw_expiry(&tier1, "k").await;
        assert!(expiry0 <= SystemTime::now() + Duration::from_secs(1));
        assert!(expiry0 >= before + Duration::from_secs(1));
        assert!(expiry1 >= before + Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_ttl_override() {
        let (cache, tier0, tier1) = two_tier(Duration::from_secs(1), Duration::from_secs(10));
        let before = SystemTime::now();

        cache
            .set_bytes("k", b"v", Some(Duration::from_secs(100)))
            .await
            .unwrap();
        assert!(raw_expiry(&tier0, "k").await >= before + Duration::from_secs(100));
        assert!(raw_expiry(&tier1, "k").await >= before + Duration::from_secs(100));

        // Zero override means tier default
        cache
            .set_bytes("z", b"v", Some(Duration::ZERO))
            .await
            .unwrap();
        assert!(raw_expiry(&tier0, "z").await <= SystemTime::now() + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_far_future_override_reads_back() {
        let (cache, tier0, _) = two_tier(Duration::from_secs(1), Duration::from_secs(10));
        let centuries = Duration::from_secs(530 * 365 * 24 * 3600);

        cache.set_bytes("k", b"v", Some(centuries)).await.unwrap();
        let (value, ttl) = cache.get_bytes_and_ttl("k").await.unwrap();
        assert_eq!(value, Bytes::from_static(b"v"));
        assert!(ttl.as_duration().unwrap() > Duration::from_secs(365 * 24 * 3600));
        assert!(raw_expiry(&tier0, "k").await > SystemTime::now());
    }

    #[tokio::test]
    async fn test_duration_max_ttl() {
        let (cache, tier0, _) = two_tier(Duration::from_secs(1), Duration::MAX);

        cache.set_bytes("k", b"v", Some(Duration::MAX)).await.unwrap();
        assert_eq!(cache.get_bytes("k").await.unwrap(), Bytes::from_static(b"v"));

        // Promotion from a tier configured with Duration::MAX
        cache.set_bytes("p", b"v", None).await.unwrap();
        tier0.delete("p").await.unwrap();
        assert_eq!(cache.get_bytes("p").await.unwrap(), Bytes::from_static(b"v"));
        assert!(raw_expiry(&tier0, "p").await <= SystemTime::now() + Duration::from_secs(1));

        let single = Cache::with_ttl(Duration::MAX).unwrap();
        single.set("k", &profile(), None).await.unwrap();
        assert_eq!(single.get::<Profile>("k").await.unwrap(), profile());
    }

    #[tokio::test]
    async fn test_fallback_promotes_with_clamped_ttl() {
        let (cache, tier0, _) = two_tier(Duration::from_secs(1), Duration::from_secs(10));

        cache.set_bytes("k", b"v", None).await.unwrap();
        tier0.delete("k").await.unwrap();

        let (value, ttl) = cache.get_bytes_and_ttl("k").await.unwrap();
        assert_eq!(value, Bytes::from_static(b"v"));
        assert!(ttl.as_duration().unwrap() > Duration::from_secs(5));

        // Tier 0 re-populated with at most its own TTL
        let expiry0 = raw_expiry(&tier0, "k").await;
        assert!(expiry0 <= SystemTime::now() + Duration::from_secs(1));
        assert_eq!(cache.metrics().promotions(0), 1);
        assert_eq!(cache.metrics().hits(1), 1);
    }

    #[tokio::test]
    async fn test_promotion_keeps_shorter_remaining_ttl() {
        let (cache, tier0, tier1) = two_tier(Duration::from_secs(30), Duration::from_secs(60));
        let short = SystemTime::now() + Duration::from_secs(2);

        tier1
            .set("k", frame(short, &encode_passthrough(b"v")), Duration::ZERO)
            .await
            .unwrap();
        cache.get_bytes("k").await.unwrap();

        let expiry0 = raw_expiry(&tier0, "k").await;
        assert!(expiry0 <= short);
    }

    #[tokio::test]
    async fn test_expired_header_falls_through() {
        let (cache, tier0, tier1) = two_tier(Duration::from_secs(1), Duration::from_secs(10));
        let past = SystemTime::now() - Duration::from_secs(1);

        // Bytes still present in tier 0, but logically expired
        tier0
            .set("k", frame(past, &encode_passthrough(b"old")), Duration::ZERO)
            .await
            .unwrap();
        assert!(matches!(cache.get_bytes("k").await, Err(Error::IsNil)));

        tier1
            .set(
                "k",
                frame(SystemTime::now() + Duration::from_secs(5), &encode_passthrough(b"new")),
                Duration::ZERO,
            )
            .await
            .unwrap();
        assert_eq!(cache.get_bytes("k").await.unwrap(), Bytes::from_static(b"new"));

        let snapshot = cache.metrics().snapshot();
        assert_eq!(snapshot.tiers[0].expired, 2);
        assert_eq!(snapshot.tiers[1].hits, 1);
    }

    #[tokio::test]
    async fn test_zero_header_is_infinite() {
        let tier = Arc::new(MemoryStore::new());
        let cache = Cache::new(CacheConfig {
            tiers: vec![tier.clone() as Arc<dyn Store>],
            ..Default::default()
        })
        .unwrap();

        let mut entry = vec![0u8; EXPIRY_HEADER_SIZE];
        entry.extend_from_slice(&encode_passthrough(b"forever"));
        tier.set("k", Bytes::from(entry), Duration::ZERO).await.unwrap();

        let (value, ttl) = cache.get_bytes_and_ttl("k").await.unwrap();
        assert_eq!(value, Bytes::from_static(b"forever"));
        assert_eq!(ttl, Ttl::Infinite);
    }

    #[tokio::test]
    async fn test_short_entry_is_miss() {
        let tier = Arc::new(MemoryStore::new());
        let cache = Cache::new(CacheConfig {
            tiers: vec![tier.clone() as Arc<dyn Store>],
            ..Default::default()
        })
        .unwrap();

        tier.set("k", Bytes::from_static(b"abc"), Duration::ZERO).await.unwrap();
        assert!(matches!(cache.get_bytes("k").await, Err(Error::IsNil)));
    }

    #[tokio::test]
    async fn test_entry_layout_and_compression() {
        let tier = Arc::new(MemoryStore::new());
        let cache = Cache::new(CacheConfig {
            tiers: vec![tier.clone() as Arc<dyn Store>],
            compressor: CompressorConfig::Threshold(CompressionConfig {
                algorithm: CompressionAlgorithm::Zstd,
                min_compress_length: 16,
                level: 0,
            }),
            ..Default::default()
        })
        .unwrap();

        cache.set_bytes("small", b"tiny", None).await.unwrap();
        let raw = tier.get("small").await.unwrap();
        assert_eq!(raw[EXPIRY_HEADER_SIZE], NOT_COMPRESSED);
        assert_eq!(&raw[EXPIRY_HEADER_SIZE + 1..], b"tiny");

        let big = "compress me ".repeat(100);
        cache.set_bytes("big", &big, None).await.unwrap();
        let raw = tier.get("big").await.unwrap();
        assert_eq!(raw[EXPIRY_HEADER_SIZE], COMPRESSED);
        assert!(raw.len() < big.len());
        assert_eq!(cache.get_bytes("big").await.unwrap(), big.as_bytes());

        let info = EntryInfo::parse(&raw).unwrap();
        assert_eq!(info.tag, Some(COMPRESSED));
        assert_eq!(info.payload_len, raw.len() - EXPIRY_HEADER_SIZE - 1);
    }

    #[tokio::test]
    async fn test_compressed_entry_without_compressor_fails() {
        let tier = Arc::new(MemoryStore::new());
        let cache = Cache::new(CacheConfig {
            tiers: vec![tier.clone() as Arc<dyn Store>],
            ..Default::default()
        })
        .unwrap();

        let expiry = SystemTime::now() + Duration::from_secs(5);
        tier.set("k", frame(expiry, &[COMPRESSED, 1, 2, 3]), Duration::ZERO)
            .await
            .unwrap();
        let err = cache.get_bytes("k").await.unwrap_err();
        assert!(err.is_codec());
    }

    #[tokio::test]
    async fn test_key_prefix() {
        let tier = Arc::new(MemoryStore::new());
        let cache = Cache::new(CacheConfig {
            tiers: vec![tier.clone() as Arc<dyn Store>],
            key_prefix: "p:".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cache.store_key("a").unwrap(), "p:a");

        cache.set_bytes("a", b"v", None).await.unwrap();
        assert!(tier.get("p:a").await.is_ok());
        assert!(matches!(tier.get("a").await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_and_close() {
        let (cache, tier0, tier1) = two_tier(Duration::from_secs(1), Duration::from_secs(10));

        cache.set("k", &profile(), None).await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(matches!(tier0.get("k").await, Err(Error::NotFound)));
        assert!(matches!(tier1.get("k").await, Err(Error::NotFound)));
        assert!(matches!(cache.get::<Profile>("k").await, Err(Error::IsNil)));

        cache.close().await.unwrap();
        assert!(tier0.is_closed());
        assert!(tier1.is_closed());
    }

    #[tokio::test]
    async fn test_inspect() {
        let (cache, tier0, _) = two_tier(Duration::from_secs(1), Duration::from_secs(10));
        cache.set_bytes("k", b"value", None).await.unwrap();
        tier0.delete("k").await.unwrap();

        let entries = cache.inspect("k").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0].entry, Ok(None)));
        let info = entries[1].entry.as_ref().unwrap().as_ref().unwrap();
        assert_eq!(info.tag, Some(NOT_COMPRESSED));
        assert_eq!(info.payload_len, 5);
        assert_eq!(entries[1].store, "memory");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Cache::with_ttl(Duration::ZERO),
            Err(Error::Config(_))
        ));
    }
}
