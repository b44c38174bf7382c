//! Cache Configuration
//!
//! Plain configuration structs with documented defaults. `Cache::new`
//! validates the configuration once and never consults it again.

use std::sync::Arc;
use std::time::Duration;

use crate::compression::{CompressionConfig, Compressor, ThresholdCompressor};
use crate::error::{Error, Result};
use crate::store::{MemoryStore, MemoryStoreConfig, Store};

/// Default TTL applied when none is configured
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Compression selection
#[derive(Clone, Default)]
pub enum CompressorConfig {
    /// Payloads are stored as-is (still tagged `NOT_COMPRESSED`)
    #[default]
    None,
    /// Built-in threshold compressor
    Threshold(CompressionConfig),
    /// Caller-supplied compressor
    Custom(Arc<dyn Compressor>),
}

impl CompressorConfig {
    /// Build the compressor, if any
    pub fn build(&self) -> Option<Arc<dyn Compressor>> {
        match self {
            CompressorConfig::None => None,
            CompressorConfig::Threshold(config) => {
                Some(Arc::new(ThresholdCompressor::new(config.clone())))
            }
            CompressorConfig::Custom(compressor) => Some(Arc::clone(compressor)),
        }
    }
}

impl std::fmt::Debug for CompressorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressorConfig::None => write!(f, "None"),
            CompressorConfig::Threshold(config) => f.debug_tuple("Threshold").field(config).finish(),
            CompressorConfig::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Cache configuration
#[derive(Clone)]
pub struct CacheConfig {
    /// Default TTL, used as the single tier TTL when `ttls` is empty
    pub ttl: Duration,
    /// Per-tier TTLs; a tier past the end of the list uses the last entry
    pub ttls: Vec<Duration>,
    /// Ordered tiers, index 0 = fastest. Empty means one memory store built from `memory`.
    pub tiers: Vec<Arc<dyn Store>>,
    /// Optional slower tier appended after `tiers`
    pub secondary: Option<Arc<dyn Store>>,
    /// Settings for the default memory store
    pub memory: MemoryStoreConfig,
    /// Prepended verbatim to every key
    pub key_prefix: String,
    /// Compression selection
    pub compressor: CompressorConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            ttls: Vec::new(),
            tiers: Vec::new(),
            secondary: None,
            memory: MemoryStoreConfig::default(),
            key_prefix: String::new(),
            compressor: CompressorConfig::None,
        }
    }
}

impl CacheConfig {
    /// Configuration with the given default TTL and a single memory tier
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(Error::Config("default ttl must be greater than zero".into()));
        }
        if let Some(index) = self.ttls.iter().position(|ttl| ttl.is_zero()) {
            return Err(Error::Config(format!(
                "ttl for tier {} must be greater than zero",
                index
            )));
        }
        if let CompressorConfig::Threshold(config) = &self.compressor {
            if config.level < 0 {
                return Err(Error::Config(format!(
                    "compression level must not be negative, got {}",
                    config.level
                )));
            }
        }
        Ok(())
    }

    /// Resolve the per-tier TTL list
    pub(crate) fn resolved_ttls(&self) -> Vec<Duration> {
        if self.ttls.is_empty() {
            vec![self.ttl]
        } else {
            self.ttls.clone()
        }
    }

    /// Resolve the ordered tier list
    pub(crate) fn resolved_tiers(&self) -> Vec<Arc<dyn Store>> {
        let mut tiers = if self.tiers.is_empty() {
            vec![Arc::new(MemoryStore::with_config(self.memory.clone())) as Arc<dyn Store>]
        } else {
            self.tiers.clone()
        };
        if let Some(secondary) = &self.secondary {
            tiers.push(Arc::clone(secondary));
        }
        tiers
    }
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("ttl", &self.ttl)
            .field("ttls", &self.ttls)
            .field(
                "tiers",
                &self.tiers.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("secondary", &self.secondary.as_ref().map(|t| t.name()))
            .field("memory", &self.memory)
            .field("key_prefix", &self.key_prefix)
            .field("compressor", &self.compressor)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressionAlgorithm;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, DEFAULT_TTL);
        assert!(config.validate().is_ok());
        assert_eq!(config.resolved_ttls(), vec![DEFAULT_TTL]);
        assert_eq!(config.resolved_tiers().len(), 1);
        assert!(config.compressor.build().is_none());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(matches!(
            CacheConfig::with_ttl(Duration::ZERO).validate(),
            Err(Error::Config(_))
        ));

        let config = CacheConfig {
            ttls: vec![Duration::from_secs(1), Duration::ZERO],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tier 1"));
    }

    #[test]
    fn test_negative_level_rejected() {
        let config = CacheConfig {
            compressor: CompressorConfig::Threshold(CompressionConfig {
                algorithm: CompressionAlgorithm::Zstd,
                min_compress_length: 10,
                level: -1,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secondary_appended() {
        let primary: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let secondary: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let config = CacheConfig {
            tiers: vec![Arc::clone(&primary)],
            secondary: Some(Arc::clone(&secondary)),
            ..Default::default()
        };

        let tiers = config.resolved_tiers();
        assert_eq!(tiers.len(), 2);
        assert!(Arc::ptr_eq(&tiers[1], &secondary));
    }

    #[test]
    fn test_threshold_compressor_built() {
        let config = CompressorConfig::Threshold(CompressionConfig::default());
        let compressor = config.build().unwrap();
        assert!(!compressor.matches(1024));
        assert!(compressor.matches(1025));
    }
}
