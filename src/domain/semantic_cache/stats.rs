//! Cache statistics

use serde::{Deserialize, Serialize};

/// Point-in-time cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live (unexpired) entries
    pub cache_size: usize,
    pub max_cache_size: usize,
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_requests: u64,
    /// Percentage of requests that hit, 0.0 when there were none
    pub hit_rate: f64,
    pub total_cached: u64,
    pub total_evictions: u64,
    pub total_errors: u64,
    pub similarity_threshold: f32,
    pub ttl_seconds: u64,
}

/// Hit rate as a percentage: `hits / (hits + misses) * 100`
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}
