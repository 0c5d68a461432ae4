//! The key-value store protocol the query cache runs on.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheError;

/// A key-value store with per-entry expiry.
///
/// Values are UTF-8 JSON text. Implementations map directly onto
/// `GET key`, `SETEX key ttl value` and `DEL key`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Short label used in logs, metrics and the config endpoint.
    fn mode(&self) -> &'static str;
}
