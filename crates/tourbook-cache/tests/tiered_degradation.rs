//! Tiered store behaviour while Redis is unreachable. No Docker needed: the
//! pool points at a local port nothing listens on.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tourbook_cache::{CacheStore, LocalStore, QueryCache, RedisStore, TieredStore};

fn refused_redis_url() -> String {
    let listener = std::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).expect("bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("redis://{addr}")
}

fn unreachable_redis() -> RedisStore {
    let mut config = deadpool_redis::Config::from_url(refused_redis_url());
    let pool_config = config.pool.get_or_insert_with(Default::default);
    pool_config.timeouts.create = Some(Duration::from_millis(500));
    pool_config.timeouts.wait = Some(Duration::from_millis(500));
    let pool = config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("create pool");
    RedisStore::new(pool)
}

#[tokio::test]
async fn unreachable_redis_reads_as_miss() {
    let remote = unreachable_redis();
    assert!(!remote.is_available().await);
    assert!(remote.get("k").await.is_err());

    let store = TieredStore::new(LocalStore::new(), remote);
    assert!(matches!(store.get("k").await, Ok(None)));
}

#[tokio::test]
async fn writes_are_kept_in_l1_when_redis_is_down() {
    let store = TieredStore::new(LocalStore::new(), unreachable_redis());

    store
        .set_ex("hotel:h-001", "{\"id\":\"h-001\"}".into(), Duration::from_secs(60))
        .await
        .expect("L2 failure is swallowed");

    assert_eq!(store.local().len(), 1);
    assert_eq!(
        store.get("hotel:h-001").await.unwrap().as_deref(),
        Some("{\"id\":\"h-001\"}")
    );

    store.delete("hotel:h-001").await.expect("L2 failure is swallowed");
    assert!(store.get("hotel:h-001").await.unwrap().is_none());
}

#[tokio::test]
async fn query_cache_over_degraded_tier_still_memoizes_locally() {
    let store = TieredStore::new(LocalStore::new(), unreachable_redis());
    let cache = QueryCache::new(Arc::new(store));
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let value: Vec<u32> = cache
            .cache_query("hotels:1:10:::", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>(vec![1, 2, 3])
            })
            .await
            .unwrap();
        assert_eq!(value, vec![1, 2, 3]);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.mode(), "redis");
}
