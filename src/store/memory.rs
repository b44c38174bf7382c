//! In-Process Memory Store
//!
//! Sharded byte store used as the default tier 0.
//!
//! # Design
//!
//! - Each shard has its own RwLock, minimizing contention
//! - Power-of-2 shard count enables fast modulo via bitwise AND
//! - Expired entries are dropped lazily on read and swept from a shard on
//!   write once the clean window has elapsed
//! - An optional hard size cap evicts the oldest-inserted entries of the
//!   shard receiving a write, in FIFO order from a per-shard queue

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::Store;
use crate::error::{Error, Result};

/// Default number of shards
pub const DEFAULT_SHARDS: usize = 8;

/// Why an entry left the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoveReason {
    /// Entry outlived its TTL
    Expired,
    /// Entry was evicted to make room under the hard size cap
    NoSpace,
    /// Entry was removed by `delete`
    Deleted,
}

/// Callback invoked after an entry is removed
pub type RemoveCallback = Arc<dyn Fn(&str, RemoveReason) + Send + Sync>;

// =============================================================================
// Configuration
// =============================================================================

/// Memory store configuration
#[derive(Clone)]
pub struct MemoryStoreConfig {
    /// Number of shards (rounded up to a power of two)
    pub shards: usize,
    /// Upper bound on any entry's lifetime (None = bounded by TTL only)
    pub life_window: Option<Duration>,
    /// Minimum interval between expiry sweeps of a shard (zero = never sweep)
    pub clean_window: Duration,
    /// Largest accepted value in bytes (0 = unlimited)
    pub max_entry_size: usize,
    /// Cap on the total bytes held across all shards (0 = unbounded)
    pub hard_max_cache_size: usize,
    /// Removal callback
    pub on_remove: Option<RemoveCallback>,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            life_window: None,
            clean_window: Duration::from_secs(60),
            max_entry_size: 0,
            hard_max_cache_size: 0,
            on_remove: None,
        }
    }
}

impl std::fmt::Debug for MemoryStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStoreConfig")
            .field("shards", &self.shards)
            .field("life_window", &self.life_window)
            .field("clean_window", &self.clean_window)
            .field("max_entry_size", &self.max_entry_size)
            .field("hard_max_cache_size", &self.hard_max_cache_size)
            .field("on_remove", &self.on_remove.is_some())
            .finish()
    }
}

// =============================================================================
// Shard
// =============================================================================

struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
    seq: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct ShardState {
    entries: HashMap<String, Entry>,
    /// Insertion order as `(seq, key)`; pairs whose entry was replaced or removed are stale
    order: VecDeque<(u64, String)>,
    next_seq: u64,
    last_sweep: Instant,
}

impl ShardState {
    fn is_current(entries: &HashMap<String, Entry>, seq: u64, key: &str) -> bool {
        entries.get(key).is_some_and(|e| e.seq == seq)
    }

    /// Drop stale queue pairs once they outnumber live entries
    fn compact_order(&mut self) {
        if self.order.len() <= 2 * self.entries.len() + 16 {
            return;
        }
        let entries = &self.entries;
        self.order
            .retain(|(seq, key)| Self::is_current(entries, *seq, key));
    }
}

/// Single shard containing a hashmap and statistics
struct Shard {
    state: RwLock<ShardState>,
    /// Number of entries
    count: AtomicU64,
    /// Total size of values (in bytes)
    size_bytes: AtomicU64,
}

impl Shard {
    fn new(now: Instant) -> Self {
        Self {
            state: RwLock::new(ShardState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
                last_sweep: now,
            }),
            count: AtomicU64::new(0),
            size_bytes: AtomicU64::new(0),
        }
    }

    fn take(&self, state: &mut ShardState, key: &str) -> Option<Entry> {
        let removed = state.entries.remove(key)?;
        self.count.fetch_sub(1, Ordering::Relaxed);
        self.size_bytes
            .fetch_sub(removed.value.len() as u64, Ordering::Relaxed);
        Some(removed)
    }

    fn sweep(&self, state: &mut ShardState, now: Instant, removed: &mut Vec<(String, RemoveReason)>) {
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.take(state, &key);
            removed.push((key, RemoveReason::Expired));
        }
        state.last_sweep = now;
    }

    fn evict_oldest(&self, state: &mut ShardState) -> Option<String> {
        while let Some((seq, key)) = state.order.pop_front() {
            if ShardState::is_current(&state.entries, seq, &key) {
                self.take(state, &key);
                return Some(key);
            }
        }
        None
    }

    fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.order.clear();
        self.count.store(0, Ordering::Relaxed);
        self.size_bytes.store(0, Ordering::Relaxed);
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Sharded in-process store
pub struct MemoryStore {
    shards: Box<[Shard]>,
    mask: usize,
    /// Per-shard byte budget (0 = unbounded)
    shard_budget: usize,
    config: MemoryStoreConfig,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create a store with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Create a store with custom configuration
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        let shard_count = config.shards.max(1).next_power_of_two();
        let now = Instant::now();
        let shards: Vec<Shard> = (0..shard_count).map(|_| Shard::new(now)).collect();
        let shard_budget = if config.hard_max_cache_size == 0 {
            0
        } else {
            (config.hard_max_cache_size / shard_count).max(1)
        };

        info!(
            shards = shard_count,
            hard_max_cache_size = config.hard_max_cache_size,
            max_entry_size = config.max_entry_size,
            "Memory store created"
        );

        Self {
            shards: shards.into_boxed_slice(),
            mask: shard_count - 1,
            shard_budget,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of entries held, including expired entries not yet swept
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.count.load(Ordering::Relaxed) as usize)
            .sum()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes of values held
    pub fn size_bytes(&self) -> u64 {
        self.shards
            .iter()
            .map(|s| s.size_bytes.load(Ordering::Relaxed))
            .sum()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) & self.mask]
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::StoreClosed);
        }
        Ok(())
    }

    /// Lifetime applied to a write with the given TTL
    fn effective_ttl(&self, ttl: Duration) -> Option<Duration> {
        match (ttl.is_zero(), self.config.life_window) {
            (true, window) => window,
            (false, Some(window)) => Some(ttl.min(window)),
            (false, None) => Some(ttl),
        }
    }

    fn notify(&self, removed: Vec<(String, RemoveReason)>) {
        if let Some(callback) = &self.config.on_remove {
            for (key, reason) in removed {
                callback(&key, reason);
            }
        }
    }

    fn set_sync(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.ensure_open()?;

        let size = value.len();
        if self.config.max_entry_size > 0 && size > self.config.max_entry_size {
            return Err(Error::EntryTooLarge {
                size,
                max: self.config.max_entry_size,
            });
        }
        if self.shard_budget > 0 && size > self.shard_budget {
            return Err(Error::EntryTooLarge {
                size,
                max: self.shard_budget,
            });
        }

        let now = Instant::now();
        // Past the range of Instant means no expiry
        let expires_at = self.effective_ttl(ttl).and_then(|d| now.checked_add(d));
        let shard = self.shard(key);
        let mut removed = Vec::new();

        {
            let mut state = shard.state.write();

            if !self.config.clean_window.is_zero()
                && now.duration_since(state.last_sweep) >= self.config.clean_window
            {
                shard.sweep(&mut state, now, &mut removed);
            }

            // Overwrite is not a removal
            shard.take(&mut state, key);

            if self.shard_budget > 0 {
                while shard.size_bytes.load(Ordering::Relaxed) as usize + size > self.shard_budget {
                    match shard.evict_oldest(&mut state) {
                        Some(evicted) => removed.push((evicted, RemoveReason::NoSpace)),
                        None => break,
                    }
                }
            }

            let seq = state.next_seq;
            state.next_seq += 1;
            state.order.push_back((seq, key.to_string()));
            state.entries.insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at,
                    seq,
                },
            );
            shard.count.fetch_add(1, Ordering::Relaxed);
            shard.size_bytes.fetch_add(size as u64, Ordering::Relaxed);
            state.compact_order();
        }

        if !removed.is_empty() {
            debug!(key, removed = removed.len(), "Memory store removed entries on write");
        }
        self.notify(removed);
        Ok(())
    }

    fn get_sync(&self, key: &str) -> Result<Bytes> {
        self.ensure_open()?;

        let now = Instant::now();
        let shard = self.shard(key);
        {
            let state = shard.state.read();
            match state.entries.get(key) {
                None => return Err(Error::NotFound),
                Some(entry) if !entry.is_expired(now) => return Ok(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: drop it unless it was replaced in between
        let expired = {
            let mut state = shard.state.write();
            let current = state
                .entries
                .get(key)
                .map(|e| (e.is_expired(now), e.value.clone()));
            match current {
                Some((true, _)) => shard.take(&mut state, key).is_some(),
                Some((false, value)) => return Ok(value),
                None => false,
            }
        };
        if expired {
            self.notify(vec![(key.to_string(), RemoveReason::Expired)]);
        }
        Err(Error::NotFound)
    }

    fn delete_sync(&self, key: &str) -> Result<()> {
        self.ensure_open()?;

        let shard = self.shard(key);
        let removed = {
            let mut state = shard.state.write();
            shard.take(&mut state, key)
        };
        if removed.is_some() {
            self.notify(vec![(key.to_string(), RemoveReason::Deleted)]);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.set_sync(key, value, ttl)
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        self.get_sync(key)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete_sync(key)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for shard in self.shards.iter() {
            shard.clear();
        }
        info!("Memory store closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// =============================================================================
// Tests
// =============================================================================
