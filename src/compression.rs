//! Payload Compression
//!
//! Threshold-gated compression with a one-byte tag ahead of the payload.
//! Payloads at or below the minimum length are stored as-is under the
//! `NOT_COMPRESSED` tag.
//!
//! # Example
//!
//! ```
//! use tiercache::compression::{CompressionConfig, Compressor, ThresholdCompressor};
//!
//! let compressor = ThresholdCompressor::new(CompressionConfig::default());
//!
//! let data = "tiered cache ".repeat(200);
//! let encoded = compressor.encode(data.as_bytes()).unwrap();
//! assert!(encoded.len() < data.len());
//!
//! let decoded = compressor.decode(&encoded).unwrap();
//! assert_eq!(decoded, data.as_bytes());
//! ```

use std::io::Cursor;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Tag for payloads stored as-is
pub const NOT_COMPRESSED: u8 = 0;

/// Tag for payloads run through the compression function
pub const COMPRESSED: u8 = 1;

// =============================================================================
// Compression Algorithm
// =============================================================================

/// Built-in compression algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionAlgorithm {
    /// LZ4 - fast compression
    #[default]
    Lz4,
    /// Zstandard - better ratio, tunable level
    Zstd,
}

impl CompressionAlgorithm {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Lz4 => "lz4",
            CompressionAlgorithm::Zstd => "zstd",
        }
    }

    /// Get list of available algorithms
    pub fn available_algorithms() -> Vec<Self> {
        vec![Self::Lz4, Self::Zstd]
    }
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for CompressionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            other => Err(Error::Config(format!(
                "unknown compression algorithm: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Compression Configuration
// =============================================================================

/// Configuration for threshold compression
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Algorithm to use
    pub algorithm: CompressionAlgorithm,
    /// Payloads of this length or shorter are stored uncompressed
    pub min_compress_length: usize,
    /// Compression level (algorithm-specific, 0 = library default)
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            algorithm: CompressionAlgorithm::Lz4,
            min_compress_length: 1024, // 1KB minimum
            level: 0,
        }
    }
}

// =============================================================================
// Compressor Trait
// =============================================================================

/// Capability used by the orchestrator to compress payloads
pub trait Compressor: Send + Sync {
    /// True if a payload of `size` bytes should be compressed
    fn matches(&self, size: usize) -> bool;

    /// Compress if matched and prepend the tag byte
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Read the tag byte and decompress if needed. Empty input decodes to empty output.
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Prepend `NOT_COMPRESSED` to `data`
pub fn encode_passthrough(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + 1);
    buf.push(NOT_COMPRESSED);
    buf.extend_from_slice(data);
    buf
}

/// Decode a tagged payload, with or without a compressor configured
pub fn decode_tagged(compressor: Option<&dyn Compressor>, data: &[u8]) -> Result<Vec<u8>> {
    if let Some(compressor) = compressor {
        return compressor.decode(data);
    }
    match data.split_first() {
        None => Ok(Vec::new()),
        Some((&NOT_COMPRESSED, payload)) => Ok(payload.to_vec()),
        Some((&COMPRESSED, _)) => Err(Error::DecompressionFailed {
            algorithm: "none".into(),
            reason: "payload is compressed but no compressor is configured".into(),
        }),
        Some((tag, _)) => Err(unknown_tag(*tag, "none")),
    }
}

fn unknown_tag(tag: u8, algorithm: &str) -> Error {
    Error::DecompressionFailed {
        algorithm: algorithm.into(),
        reason: format!("unknown compression tag {}", tag),
    }
}

// =============================================================================
// Codec Functions
// =============================================================================

type CodecFn = Arc<dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync>;

fn lz4_compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let mode = if level > 0 {
        lz4::block::CompressionMode::HIGHCOMPRESSION(level)
    } else {
        lz4::block::CompressionMode::DEFAULT
    };
    lz4::block::compress(data, Some(mode), true).map_err(|e| Error::CompressionFailed {
        algorithm: "lz4".into(),
        reason: e.to_string(),
    })
}

fn lz4_decompress(data: &[u8]) -> Result<Vec<u8>> {
    lz4::block::decompress(data, None).map_err(|e| Error::DecompressionFailed {
        algorithm: "lz4".into(),
        reason: e.to_string(),
    })
}

fn zstd_compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    zstd::encode_all(Cursor::new(data), level).map_err(|e| Error::CompressionFailed {
        algorithm: "zstd".into(),
        reason: e.to_string(),
    })
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(Cursor::new(data)).map_err(|e| Error::DecompressionFailed {
        algorithm: "zstd".into(),
        reason: e.to_string(),
    })
}

// =============================================================================
// Threshold Compressor
// =============================================================================

/// Compressor that only compresses payloads longer than a minimum length
#[derive(Clone)]
pub struct ThresholdCompressor {
    name: String,
    min_compress_length: usize,
    compress: CodecFn,
    decompress: CodecFn,
}

impl ThresholdCompressor {
    /// Create from a built-in algorithm configuration
    pub fn new(config: CompressionConfig) -> Self {
        let level = config.level;
        let (compress, decompress): (CodecFn, CodecFn) = match config.algorithm {
            CompressionAlgorithm::Lz4 => (
                Arc::new(move |data: &[u8]| lz4_compress(data, level)),
                Arc::new(lz4_decompress),
            ),
            CompressionAlgorithm::Zstd => (
                Arc::new(move |data: &[u8]| zstd_compress(data, level)),
                Arc::new(zstd_decompress),
            ),
        };
        Self {
            name: config.algorithm.name().to_string(),
            min_compress_length: config.min_compress_length,
            compress,
            decompress,
        }
    }

    /// Create from a custom compress/decompress function pair
    pub fn from_fns<C, D>(
        name: impl Into<String>,
        min_compress_length: usize,
        compress: C,
        decompress: D,
    ) -> Self
    where
        C: Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            min_compress_length,
            compress: Arc::new(compress),
            decompress: Arc::new(decompress),
        }
    }

    /// Name of the compression function
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum compress length
    pub fn min_compress_length(&self) -> usize {
        self.min_compress_length
    }
}

impl Compressor for ThresholdCompressor {
    fn matches(&self, size: usize) -> bool {
        size > self.min_compress_length
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        if !self.matches(data.len()) {
            return Ok(encode_passthrough(data));
        }
        let compressed = (self.compress)(data)?;
        let mut buf = Vec::with_capacity(compressed.len() + 1);
        buf.push(COMPRESSED);
        buf.extend_from_slice(&compressed);
        Ok(buf)
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match data.split_first() {
            None => Ok(Vec::new()),
            Some((&NOT_COMPRESSED, payload)) => Ok(payload.to_vec()),
            Some((&COMPRESSED, payload)) => (self.decompress)(payload),
            Some((tag, _)) => Err(unknown_tag(*tag, &self.name)),
        }
    }
}

impl std::fmt::Debug for ThresholdCompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdCompressor")
            .field("name", &self.name)
            .field("min_compress_length", &self.min_compress_length)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
