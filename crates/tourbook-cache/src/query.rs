//! Get-or-compute front end over a [`CacheStore`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::store::CacheStore;

/// Read-through cache for expensive, idempotent queries.
///
/// Cloning is cheap; every clone shares the same store.
///
/// There is no single-flight guard: two concurrent misses on the same key
/// both compute and both write, the last write wins.
#[derive(Clone)]
pub struct QueryCache {
    store: Option<Arc<dyn CacheStore>>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache").field("mode", &self.mode()).finish()
    }
}

impl QueryCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A cache that never stores anything; every call computes.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn mode(&self) -> &'static str {
        self.store.as_ref().map_or("disabled", |s| s.mode())
    }

    /// Return the value cached under `key`, or compute, store and return it.
    ///
    /// Errors returned by `compute` propagate and are never cached. Store and
    /// serialization failures are logged and degrade to calling `compute`
    /// directly. A zero `ttl` bypasses the store.
    pub async fn cache_query<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(store) = self.store.as_ref().filter(|_| !ttl.is_zero()) else {
            return compute().await;
        };
        let mode = store.mode();

        match store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!(key = %key, "cache hit");
                    crate::metrics::record_hit(mode);
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Cached value does not deserialize, recomputing");
                    crate::metrics::record_error(mode, "decode");
                }
            },
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, computing directly");
                crate::metrics::record_error(mode, "get");
            }
        }
        crate::metrics::record_miss(mode);

        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = store.set_ex(key, raw, ttl).await {
                    tracing::warn!(key = %key, error = %e, "Cache write failed, result not memoized");
                    crate::metrics::record_error(mode, "set");
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Result does not serialize, not memoized");
                crate::metrics::record_error(mode, "encode");
            }
        }

        Ok(value)
    }

    /// Raw lookup of stored JSON text. Failures read as a miss.
    pub async fn lookup(&self, key: &str) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed");
                crate::metrics::record_error(store.mode(), "get");
                None
            }
        }
    }

    /// Raw write of JSON text. Failures are logged and dropped.
    pub async fn store(&self, key: &str, value: String, ttl: Duration) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if ttl.is_zero() {
            return;
        }
        if let Err(e) = store.set_ex(key, value, ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
            crate::metrics::record_error(store.mode(), "set");
        }
    }

    /// Best-effort removal of a single key.
    ///
    /// The read paths never call this; entries otherwise live out their TTL.
    pub async fn invalidate(&self, key: &str) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match store.delete(key).await {
            Ok(()) => tracing::debug!(key = %key, "cache invalidated"),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache invalidation failed");
                crate::metrics::record_error(store.mode(), "delete");
            }
        }
    }
}
