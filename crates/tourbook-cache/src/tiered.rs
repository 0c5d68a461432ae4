//! Two-tier store: L1 (DashMap) in front of L2 (Redis).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;
use crate::local::LocalStore;
use crate::redis_store::RedisStore;
use crate::store::CacheStore;

/// Two-tier store: L1 (local) + L2 (Redis).
///
/// ## Lookup Order
///
/// 1. Check L1 - microsecond latency
/// 2. Check L2 - millisecond latency, promote hit to L1 with its remaining TTL
///
/// ## Write Strategy
///
/// Writes go to both tiers. An L2 failure is logged and swallowed, so a Redis
/// outage degrades to local-only caching instead of an error.
#[derive(Clone)]
pub struct TieredStore {
    local: LocalStore,
    remote: RedisStore,
}

impl TieredStore {
    pub fn new(local: LocalStore, remote: RedisStore) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn remote(&self) -> &RedisStore {
        &self.remote
    }
}

#[async_trait]
impl CacheStore for TieredStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(data) = self.local.lookup(key) {
            tracing::debug!(key = %key, "cache hit (L1)");
            crate::metrics::record_tier_hit("L1");
            return Ok(Some(data.to_string()));
        }

        match self.remote.get_with_ttl(key).await {
            Ok(Some((value, ttl))) => {
                tracing::debug!(key = %key, "cache hit (L2)");
                crate::metrics::record_tier_hit("L2");
                self.local.insert(key, value.as_str(), ttl);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Redis GET error, serving L1 only");
                Ok(None)
            }
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.local.insert(key, value.as_str(), ttl);

        if let Err(e) = self.remote.set_ex(key, value, ttl).await {
            tracing::warn!(key = %key, error = %e, "Redis SETEX error, entry kept in L1 only");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.local.remove(key);

        if let Err(e) = self.remote.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Redis DEL error");
        }
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "redis"
    }
}
