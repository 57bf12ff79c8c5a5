//! Result caching.
//!
//! - [`CacheBackend`] - GET / SET-with-TTL key-value store
//! - [`MemoryCache`] - bounded in-process backend with per-entry expiry
//! - [`DisabledCache`] - always misses
//! - [`RedisCache`] - Redis backend (`redis` feature)
//! - [`CacheAside`] - read, compute on miss, store best-effort

mod aside;
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use aside::CacheAside;
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

use crate::config::{CacheConfig, CacheKind};
use crate::Depth;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Namespace prefix of every cache key.
pub const KEY_NAMESPACE: &str = "sf";

/// Expiry of cached results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Hex characters of the digest kept in a key.
const DIGEST_CHARS: usize = 32;

/// Errors from a cache backend. Callers treat every one of them as a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
    /// The backend rejected the operation.
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// A key-value store with expiring entries.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Cache key for a (FEN, depth) pair: `sf:{depth}:{first 32 hex chars of
/// sha256("{fen}-{depth}")}`.
///
/// The depth appears both in the hashed material and in the visible prefix.
///
/// # Arguments
///
/// * `fen` - FEN text exactly as validated, without normalization
/// * `depth` - Search depth
///
/// # Returns
///
/// A key such as `sf:15:2fc066f22c4528735a2b3b8c8c8febc2`.
pub fn cache_key(fen: &str, depth: Depth) -> String {
    let digest = Sha256::digest(format!("{}-{}", fen, depth).as_bytes());
    let hex = hex::encode(digest);
    format!("{}:{}:{}", KEY_NAMESPACE, depth, &hex[..DIGEST_CHARS])
}

/// Backend that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

#[async_trait]
impl CacheBackend for DisabledCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Build the configured backend. A backend that cannot be reached degrades
/// to [`DisabledCache`].
pub async fn connect(config: &CacheConfig) -> Arc<dyn CacheBackend> {
    match config.backend {
        CacheKind::Memory => Arc::new(MemoryCache::new()),
        CacheKind::Disabled => Arc::new(DisabledCache),
        CacheKind::Redis => connect_redis(&config.url).await,
    }
}

#[cfg(feature = "redis")]
async fn connect_redis(url: &str) -> Arc<dyn CacheBackend> {
    match RedisCache::connect(url).await {
        Ok(cache) => {
            tracing::info!(url, "Connected to Redis cache");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "Redis unavailable, caching disabled");
            Arc::new(DisabledCache)
        }
    }
}

#[cfg(not(feature = "redis"))]
async fn connect_redis(url: &str) -> Arc<dyn CacheBackend> {
    tracing::warn!(
        url,
        "Redis backend requested but built without the `redis` feature, caching disabled"
    );
    Arc::new(DisabledCache)
}
