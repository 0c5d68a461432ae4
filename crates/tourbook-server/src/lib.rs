pub mod config;
pub mod error;
pub mod handlers;
pub mod hotels;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod proxy;
pub mod server;

use std::sync::Arc;

use tourbook_cache::{CacheStore, LocalStore, RedisStore, TieredStore};

pub use config::{AppConfig, CacheConfig, DataConfig, ProxyConfig, RedisConfig, ServerConfig};
pub use error::ApiError;
pub use observability::init_tracing;
pub use server::{AppState, ServerBuilder, TourbookServer, build_app, build_router};

/// Create a cache store based on configuration.
///
/// ## Cache Modes
///
/// - **Redis disabled**: Returns local-only store (DashMap)
/// - **Redis enabled**: Attempts to connect to Redis, falls back to local on failure
///
/// ## Graceful Degradation
///
/// If Redis connection fails, the system automatically falls back to local-only mode.
/// This allows the server to start and run even if Redis is unavailable.
pub async fn create_cache_store(config: &RedisConfig, local_max_entries: usize) -> Arc<dyn CacheStore> {
    use std::time::Duration;

    let local = LocalStore::with_max_entries(local_max_entries);

    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return Arc::new(local);
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    // Create Redis pool configuration
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let pool_config = redis_config.pool.get_or_insert_with(Default::default);
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
    pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));

    // Create pool
    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return Arc::new(local);
        }
    };

    // Test connection
    let remote = RedisStore::new(pool);
    if remote.is_available().await {
        tracing::info!("Connected to Redis successfully");
        Arc::new(TieredStore::new(local, remote))
    } else {
        tracing::warn!("Failed to connect to Redis. Falling back to local cache.");
        Arc::new(local)
    }
}
