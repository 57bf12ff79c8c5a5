//! Redis cache backend.

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Backend storing results as Redis strings with `SETEX`.
///
/// The connection manager reconnects on its own after a dropped connection;
/// commands issued while it is down fail and are reported as misses upstream.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Open a client for `url` and establish the first connection.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

fn backend_error(err: redis::RedisError) -> CacheError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        CacheError::Unavailable(err.to_string())
    } else {
        CacheError::Backend(err.to_string())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(backend_error)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(backend_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_url_is_unavailable() {
        let err = RedisCache::connect("not a url").await.err().unwrap();
        assert!(matches!(err, CacheError::Unavailable(_)));
    }

    #[tokio::test]
    #[ignore = "requires a Redis server on localhost"]
    async fn test_round_trip_against_local_server() {
        let cache = RedisCache::connect("redis://localhost").await.unwrap();
        cache
            .set("sf:test:round-trip", "{\"score_cp\":1,\"pv\":\"\"}", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(
            cache.get("sf:test:round-trip").await.unwrap().as_deref(),
            Some("{\"score_cp\":1,\"pv\":\"\"}")
        );
    }
}
