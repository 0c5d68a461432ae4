//! Cache counters reported through the `metrics` facade.
//!
//! Without an installed recorder these are no-ops, so library users and
//! tests pay nothing for them.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_ERRORS_TOTAL: &str = "cache_errors_total";
    pub const CACHE_TIER_HITS_TOTAL: &str = "cache_tier_hits_total";
}

/// Record a get-or-compute hit.
pub fn record_hit(store: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "store" => store).increment(1);
}

/// Record a get-or-compute miss.
pub fn record_miss(store: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "store" => store).increment(1);
}

/// Record a swallowed store failure.
pub fn record_error(store: &'static str, op: &'static str) {
    counter!(names::CACHE_ERRORS_TOTAL, "store" => store, "op" => op).increment(1);
}

/// Record which tier of a tiered store answered.
pub fn record_tier_hit(tier: &'static str) {
    counter!(names::CACHE_TIER_HITS_TOTAL, "tier" => tier).increment(1);
}
