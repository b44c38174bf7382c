//! Error types for the tiered cache

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing through the cache
#[derive(Error, Debug)]
pub enum Error {
    /// Operation invoked with an empty key
    #[error("Key is nil")]
    KeyIsNil,

    /// No tier holds a currently valid copy of the key
    #[error("Data is nil")]
    IsNil,

    /// A single store does not hold the key (absent or expired at that store)
    #[error("Not found")]
    NotFound,

    // =========================================================================
    // Tier Errors
    // =========================================================================
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Store operation exceeded its deadline
    #[error("Store {operation} timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    /// Store was used after close
    #[error("Store is closed")]
    StoreClosed,

    /// Value exceeds the store's maximum entry size
    #[error("Entry of {size} bytes exceeds max entry size of {max} bytes")]
    EntryTooLarge { size: usize, max: usize },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Codec Errors
    // =========================================================================
    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Custom marshaler/unmarshaler failure
    #[error("Marshal error: {0}")]
    Marshal(String),

    /// Compression failed
    #[error("Compression with {algorithm} failed: {reason}")]
    CompressionFailed { algorithm: String, reason: String },

    /// Decompression failed
    #[error("Decompression with {algorithm} failed: {reason}")]
    DecompressionFailed { algorithm: String, reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for logical absence, either orchestrator-level or store-level
    pub fn is_nil(&self) -> bool {
        matches!(self, Error::IsNil | Error::NotFound)
    }

    /// True when the caller passed an empty key
    pub fn is_key_nil(&self) -> bool {
        matches!(self, Error::KeyIsNil)
    }

    /// True for marshal/unmarshal and compress/decompress failures
    pub fn is_codec(&self) -> bool {
        matches!(
            self,
            Error::Serialization(_)
                | Error::Marshal(_)
                | Error::CompressionFailed { .. }
                | Error::DecompressionFailed { .. }
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nil_kinds() {
        assert!(Error::IsNil.is_nil());
        assert!(Error::NotFound.is_nil());
        assert!(!Error::KeyIsNil.is_nil());
        assert!(Error::KeyIsNil.is_key_nil());
    }

    #[test]
    fn test_codec_kinds() {
        let err = Error::DecompressionFailed {
            algorithm: "lz4".into(),
            reason: "truncated".into(),
        };
        assert!(err.is_codec());
        assert_eq!(err.to_string(), "Decompression with lz4 failed: truncated");
        assert!(!Error::StoreClosed.is_codec());
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            operation: "get",
            duration: Duration::from_secs(3),
        };
        assert_eq!(err.to_string(), "Store get timed out after 3s");
    }
}
