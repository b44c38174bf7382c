//! Cache Metrics Collection
//!
//! Per-tier read statistics and write counters for monitoring cache health.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for a single tier
#[derive(Debug, Default)]
struct TierCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    read_errors: AtomicU64,
    promotions: AtomicU64,
    promotion_failures: AtomicU64,
    read_latency_us: AtomicU64,
}

/// Cache metrics collector
#[derive(Debug)]
pub struct CacheMetrics {
    tiers: Box<[TierCounters]>,

    // Orchestrator-level results
    nil_results: AtomicU64,
    sets: AtomicU64,
    set_failures: AtomicU64,
    deletes: AtomicU64,
    delete_failures: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector for `tier_count` tiers
    pub fn new(tier_count: usize) -> Self {
        Self {
            tiers: (0..tier_count).map(|_| TierCounters::default()).collect(),
            nil_results: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            set_failures: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            delete_failures: AtomicU64::new(0),
        }
    }

    fn tier(&self, index: usize) -> Option<&TierCounters> {
        self.tiers.get(index)
    }

    // Reads
    pub fn record_hit(&self, tier: usize) {
        if let Some(t) = self.tier(tier) {
            t.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_miss(&self, tier: usize) {
        if let Some(t) = self.tier(tier) {
            t.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Entry was present but its inline expiry had passed
    pub fn record_expired(&self, tier: usize) {
        if let Some(t) = self.tier(tier) {
            t.expired.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_read_error(&self, tier: usize) {
        if let Some(t) = self.tier(tier) {
            t.read_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_nil(&self) {
        self.nil_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_latency(&self, tier: usize, duration: Duration) {
        if let Some(t) = self.tier(tier) {
            update_latency_ema(&t.read_latency_us, duration);
        }
    }

    // Promotion
    pub fn record_promotion(&self, tier: usize) {
        if let Some(t) = self.tier(tier) {
            t.promotions.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_promotion_failure(&self, tier: usize) {
        if let Some(t) = self.tier(tier) {
            t.promotion_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    // Writes
    pub fn record_set(&self, ok: bool) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.set_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_delete(&self, ok: bool) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.delete_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn hits(&self, tier: usize) -> u64 {
        self.tier(tier)
            .map_or(0, |t| t.hits.load(Ordering::Relaxed))
    }

    pub fn misses(&self, tier: usize) -> u64 {
        self.tier(tier)
            .map_or(0, |t| t.misses.load(Ordering::Relaxed))
    }

    pub fn promotions(&self, tier: usize) -> u64 {
        self.tier(tier)
            .map_or(0, |t| t.promotions.load(Ordering::Relaxed))
    }

    pub fn nil_results(&self) -> u64 {
        self.nil_results.load(Ordering::Relaxed)
    }

    /// Share of reads answered by any tier
    pub fn overall_hit_ratio(&self) -> f64 {
        let hits: u64 = self
            .tiers
            .iter()
            .map(|t| t.hits.load(Ordering::Relaxed))
            .sum();
        let total = hits + self.nil_results();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tiers: self
                .tiers
                .iter()
                .map(|t| {
                    let hits = t.hits.load(Ordering::Relaxed);
                    let misses = t.misses.load(Ordering::Relaxed);
                    let expired = t.expired.load(Ordering::Relaxed);
                    let lookups = hits + misses + expired;
                    TierSnapshot {
                        hits,
                        misses,
                        expired,
                        read_errors: t.read_errors.load(Ordering::Relaxed),
                        promotions: t.promotions.load(Ordering::Relaxed),
                        promotion_failures: t.promotion_failures.load(Ordering::Relaxed),
                        hit_ratio: if lookups == 0 {
                            0.0
                        } else {
                            hits as f64 / lookups as f64
                        },
                        read_latency: Duration::from_micros(
                            t.read_latency_us.load(Ordering::Relaxed),
                        ),
                    }
                })
                .collect(),
            nil_results: self.nil_results(),
            sets: self.sets.load(Ordering::Relaxed),
            set_failures: self.set_failures.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
            overall_hit_ratio: self.overall_hit_ratio(),
        }
    }

    /// Reset all metrics
    pub fn reset(&self) {
        for t in self.tiers.iter() {
            t.hits.store(0, Ordering::Relaxed);
            t.misses.store(0, Ordering::Relaxed);
            t.expired.store(0, Ordering::Relaxed);
            t.read_errors.store(0, Ordering::Relaxed);
            t.promotions.store(0, Ordering::Relaxed);
            t.promotion_failures.store(0, Ordering::Relaxed);
            t.read_latency_us.store(0, Ordering::Relaxed);
        }
        self.nil_results.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.set_failures.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.delete_failures.store(0, Ordering::Relaxed);
    }
}

fn update_latency_ema(target: &AtomicU64, duration: Duration) {
    let new_us = duration.as_micros() as u64;
    let alpha = 0.1; // EMA smoothing factor

    loop {
        let current = target.load(Ordering::Relaxed);
        let updated = if current == 0 {
            new_us
        } else {
            ((1.0 - alpha) * current as f64 + alpha * new_us as f64) as u64
        };

        if target
            .compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            break;
        }
    }
}

/// Snapshot of one tier's metrics
#[derive(Debug, Clone)]
pub struct TierSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub read_errors: u64,
    pub promotions: u64,
    pub promotion_failures: u64,
    pub hit_ratio: f64,
    pub read_latency: Duration,
}

/// Snapshot of all cache metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Per-tier statistics, index 0 = fastest tier
    pub tiers: Vec<TierSnapshot>,

    pub nil_results: u64,
    pub sets: u64,
    pub set_failures: u64,
    pub deletes: u64,
    pub delete_failures: u64,

    pub overall_hit_ratio: f64,
}

// =============================================================================
// Tests
// =============================================================================
