//! Read-through caching for expensive queries.
//!
//! ## Architecture
//!
//! - **L1 Store (DashMap)**: In-memory, microsecond latency, per-instance
//! - **L2 Store (Redis)**: Network, millisecond latency, shared across instances
//! - **QueryCache**: get-or-compute front end over any [`CacheStore`]
//!
//! ## Lookup Flow
//!
//! ```text
//! cache_query(key) → store GET → hit: deserialize, return
//!                        ↓
//!                      miss → compute() → store SETEX → return
//! ```
//!
//! ## Graceful Degradation
//!
//! A store that fails on lookup or write never fails the caller. The query is
//! computed directly and the result returned unmemoized.

pub mod error;
pub mod key;
pub mod local;
pub mod metrics;
pub mod query;
pub mod redis_store;
pub mod store;
pub mod tiered;

pub use error::CacheError;
pub use key::CacheKey;
pub use local::{CachedEntry, LocalStore};
pub use query::QueryCache;
pub use redis_store::RedisStore;
pub use store::CacheStore;
pub use tiered::TieredStore;
