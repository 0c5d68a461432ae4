//! Shared store backed by a Redis connection pool.

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::time::Duration;

use crate::error::CacheError;
use crate::store::CacheStore;

/// Multi-instance store speaking `GET` / `SETEX` / `DEL` to Redis.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Check if Redis is reachable (for health checks).
    pub async fn is_available(&self) -> bool {
        self.pool.get().await.is_ok()
    }

    /// Fetch a value together with its remaining lifetime.
    ///
    /// Used by the tiered store so that promoted L1 entries never outlive
    /// the L2 entry they were copied from.
    pub async fn get_with_ttl(&self, key: &str) -> Result<Option<(String, Duration)>, CacheError> {
        let mut conn = self.pool.get().await?;
        let (value, ttl_ms): (Option<String>, i64) = redis::pipe()
            .get(key)
            .pttl(key)
            .query_async(&mut conn)
            .await?;

        // PTTL is -2 for a missing key and -1 for a key without expiry
        Ok(value.and_then(|v| match ttl_ms {
            ms if ms > 0 => Some((v, Duration::from_millis(ms as u64))),
            -1 => Some((v, Duration::MAX)),
            _ => None,
        }))
    }
}

/// SETEX takes whole seconds; round up so a sub-second TTL still caches.
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        tracing::debug!(key = %key, hit = value.is_some(), "redis GET");
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let secs = ttl_secs(ttl);
        conn.set_ex::<_, _, ()>(key, value, secs).await?;
        tracing::debug!(key = %key, ttl_secs = secs, "redis SETEX");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_secs_rounds_up() {
        assert_eq!(ttl_secs(Duration::from_secs(30)), 30);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }
}
