//! In-process store backed by DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CacheError;
use crate::store::CacheStore;

/// Default upper bound on the number of entries held locally.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// A full store evicts `max_entries / EVICTION_FRACTION` entries at once.
const EVICTION_FRACTION: usize = 10;

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` so a hit only bumps a reference count while
/// the shard lock is held.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<str>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: impl Into<Arc<str>>, ttl: Duration) -> Self {
        Self {
            data: data.into(),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }

    fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.cached_at.elapsed())
    }
}

/// Single-instance store: a local DashMap only.
///
/// Expired entries are dropped lazily on lookup and eagerly when the store
/// reaches its entry limit.
#[derive(Clone, Debug)]
pub struct LocalStore {
    entries: Arc<DashMap<String, CachedEntry>>,
    max_entries: usize,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    pub(crate) fn lookup(&self, key: &str) -> Option<Arc<str>> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Some(Arc::clone(&entry.data));
            }
            // Guard must go before remove() or the shard deadlocks
            drop(entry);
            self.entries.remove(key);
        }
        None
    }

    pub(crate) fn insert(&self, key: &str, value: impl Into<Arc<str>>, ttl: Duration) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.make_room();
        }
        self.entries
            .insert(key.to_string(), CachedEntry::new(value, ttl));
    }

    pub(crate) fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn make_room(&self) {
        if self.purge_expired() > 0 {
            return;
        }

        // Still full: evict the batch closest to expiry. The scan is O(n), so
        // freeing a tenth of the capacity at once keeps it off most writes.
        let batch = (self.max_entries / EVICTION_FRACTION).max(1);
        let mut candidates: Vec<(Duration, String)> = self
            .entries
            .iter()
            .map(|entry| (entry.value().remaining(), entry.key().clone()))
            .collect();
        if candidates.len() > batch {
            candidates.select_nth_unstable(batch - 1);
            candidates.truncate(batch);
        }

        tracing::debug!(evicted = candidates.len(), "evicting local cache entries");
        for (_, key) in candidates {
            self.entries.remove(&key);
        }
    }
}

#[async_trait]
impl CacheStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.lookup(key).map(|data| data.to_string()))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.insert(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.remove(key);
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_get_set() {
        let store = LocalStore::new();
        store
            .set_ex("k", "\"v\"".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("\"v\""));
        assert_eq!(store.len(), 1);
        assert_eq!(store.mode(), "local");
    }

    #[tokio::test]
    async fn test_local_store_expiration() {
        let store = LocalStore::new();
        store
            .set_ex("k", "1".to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(store.get("k").await.unwrap().is_none());
        // Lazy removal on lookup
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_local_store_delete() {
        let store = LocalStore::new();
        store
            .set_ex("k", "1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        store.delete("missing").await.unwrap();

        assert!(store.get("k").await.unwrap().is_none());
    }

    #[test]
    fn test_local_store_evicts_when_full() {
        let store = LocalStore::with_max_entries(2);
        store.insert("short", "1", Duration::from_secs(5));
        store.insert("long", "2", Duration::from_secs(600));
        store.insert("new", "3", Duration::from_secs(600));

        assert_eq!(store.len(), 2);
        assert!(store.lookup("short").is_none());
        assert!(store.lookup("long").is_some());
        assert!(store.lookup("new").is_some());
    }

    #[test]
    fn test_full_store_evicts_a_batch_closest_to_expiry() {
        let store = LocalStore::with_max_entries(20);
        for i in 0..20u64 {
            store.insert(&format!("k{i}"), "v", Duration::from_secs(60 + i));
        }

        store.insert("new", "v", Duration::from_secs(600));

        // Two slots freed in one scan, the shortest-lived ones
        assert_eq!(store.len(), 19);
        assert!(store.lookup("k0").is_none());
        assert!(store.lookup("k1").is_none());
        assert!(store.lookup("k2").is_some());
        assert!(store.lookup("new").is_some());

        // Next insert fits without another eviction
        store.insert("newer", "v", Duration::from_secs(600));
        assert_eq!(store.len(), 20);
        assert!(store.lookup("k2").is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let store = LocalStore::with_max_entries(1);
        store.insert("k", "1", Duration::from_secs(60));
        store.insert("k", "2", Duration::from_secs(60));

        assert_eq!(store.lookup("k").as_deref(), Some("2"));
    }
}
