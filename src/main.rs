//! tiercache CLI
//!
//! Reads and writes through a tiered cache built from command line flags.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │     CLI      │───▶│    Cache     │───▶│ memory tier  │
//! │   (clap)     │    │ orchestrator │───▶│ redis tier   │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tiercache::compression::{COMPRESSED, NOT_COMPRESSED};
use tiercache::{
    Cache, CacheConfig, CompressionAlgorithm, CompressionConfig, CompressorConfig, Error,
    RedisStore, RedisStoreConfig, Store,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// tiercache - tiered cache with inline TTL and promotion
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Default TTL in seconds
    #[arg(long, env = "TIERCACHE_TTL_SECS", default_value = "60")]
    ttl_secs: u64,

    /// Per-tier TTLs in seconds, comma separated (e.g. 1,10)
    #[arg(long, env = "TIERCACHE_TIER_TTLS", value_delimiter = ',')]
    tier_ttls: Vec<u64>,

    /// Key prefix
    #[arg(long, env = "TIERCACHE_PREFIX", default_value = "")]
    prefix: String,

    /// Redis URL; adds redis as the slower tier
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Redis command timeout in milliseconds
    #[arg(long, env = "REDIS_TIMEOUT_MS", default_value = "3000")]
    redis_timeout_ms: u64,

    /// Compression (none, lz4, zstd)
    #[arg(long, env = "TIERCACHE_COMPRESSION", default_value = "none")]
    compression: String,

    /// Payloads of this length or shorter are not compressed
    #[arg(long, env = "TIERCACHE_MIN_COMPRESS_LENGTH", default_value = "1024")]
    min_compress_length: usize,

    /// Compression level (0 = library default)
    #[arg(long, env = "TIERCACHE_LEVEL", default_value = "0")]
    level: i32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a value
    Set {
        key: String,
        value: String,
        /// TTL override in seconds
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
    /// Read a value
    Get { key: String },
    /// Delete a key from every tier
    Delete { key: String },
    /// Show the raw entry header at every tier
    Inspect { key: String },
    /// Set, read and expire a value
    Demo,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    let cache = build_cache(&args).await?;

    let result = run(&cache, &args.command).await;
    cache.close().await.context("closing cache")?;
    result
}

async fn build_cache(args: &Args) -> anyhow::Result<Cache> {
    let compressor = match args.compression.to_lowercase().as_str() {
        "none" | "" => CompressorConfig::None,
        name => CompressorConfig::Threshold(CompressionConfig {
            algorithm: name.parse::<CompressionAlgorithm>()?,
            min_compress_length: args.min_compress_length,
            level: args.level,
        }),
    };

    let secondary = match &args.redis_url {
        Some(url) => {
            let store = RedisStore::connect(RedisStoreConfig {
                url: url.clone(),
                command_timeout: Duration::from_millis(args.redis_timeout_ms),
            })
            .await
            .with_context(|| format!("connecting to redis at {}", url))?;
            Some(Arc::new(store) as Arc<dyn Store>)
        }
        None => None,
    };

    let config = CacheConfig {
        ttl: Duration::from_secs(args.ttl_secs),
        ttls: args.tier_ttls.iter().map(|s| Duration::from_secs(*s)).collect(),
        secondary,
        key_prefix: args.prefix.clone(),
        compressor,
        ..Default::default()
    };

    info!(config = ?config, "Building cache");
    Ok(Cache::new(config)?)
}

async fn run(cache: &Cache, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Set {
            key,
            value,
            ttl_secs,
        } => {
            cache
                .set_bytes(key, value, ttl_secs.map(Duration::from_secs))
                .await?;
            println!("OK");
        }
        Command::Get { key } => match cache.get_bytes_and_ttl(key).await {
            Ok((value, ttl)) => {
                println!("{}", String::from_utf8_lossy(&value));
                match ttl.as_duration() {
                    Some(remaining) => println!("ttl: {:?}", remaining),
                    None => println!("ttl: none"),
                }
            }
            Err(Error::IsNil) => println!("(nil)"),
            Err(err) => return Err(err.into()),
        },
        Command::Delete { key } => {
            cache.delete(key).await?;
            println!("OK");
        }
        Command::Inspect { key } => inspect(cache, key).await?,
        Command::Demo => demo(cache).await?,
    }
    Ok(())
}

async fn inspect(cache: &Cache, key: &str) -> anyhow::Result<()> {
    println!("key: {}", cache.store_key(key)?);
    for tier in cache.inspect(key).await? {
        match tier.entry {
            Ok(Some(info)) => {
                let expiry = match info.expiry {
                    Some(at) => DateTime::<Utc>::from(at).to_rfc3339(),
                    None => "none".to_string(),
                };
                let expired = info.expiry.is_some_and(|at| at <= SystemTime::now());
                let tag = match info.tag {
                    Some(NOT_COMPRESSED) => "not-compressed".to_string(),
                    Some(COMPRESSED) => "compressed".to_string(),
                    Some(other) => format!("unknown({})", other),
                    None => "-".to_string(),
                };
                println!(
                    "tier {} [{}]: expiry={}{} tag={} payload={} bytes",
                    tier.tier,
                    tier.store,
                    expiry,
                    if expired { " (expired)" } else { "" },
                    tag,
                    info.payload_len
                );
            }
            Ok(None) => println!("tier {} [{}]: miss", tier.tier, tier.store),
            Err(err) => println!("tier {} [{}]: error: {}", tier.tier, tier.store, err),
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct DemoData {
    name: String,
}

async fn demo(cache: &Cache) -> anyhow::Result<()> {
    let ttl = Duration::from_secs(1);
    let data = DemoData {
        name: "tree.xie".to_string(),
    };

    cache.set("demo", &data, Some(ttl)).await?;
    let (value, remaining) = cache.get_and_ttl::<DemoData>("demo").await?;
    println!("get: {:?} (ttl {:?})", value, remaining);

    tokio::time::sleep(ttl * 2).await;
    match cache.get::<DemoData>("demo").await {
        Err(Error::IsNil) => println!("after {:?}: expired", ttl * 2),
        Ok(value) => println!("after {:?}: still present: {:?}", ttl * 2, value),
        Err(err) => return Err(err.into()),
    }

    let snapshot = cache.metrics().snapshot();
    println!(
        "metrics: sets={} nil={} hit_ratio={:.2}",
        snapshot.sets, snapshot.nil_results, snapshot.overall_hit_ratio
    );
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("redis=warn".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
