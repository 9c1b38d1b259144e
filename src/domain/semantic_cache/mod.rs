//! Semantic cache domain models and traits
//!
//! Provides vector-based caching that matches semantically similar queries
//! rather than requiring exact key matches.

mod clock;
mod config;
mod entry;
mod index;
mod stats;

pub use clock::{Clock, SystemClock};
pub use config::SemanticCacheConfig;
pub use entry::{CacheEntry, CachedAnswer, expiry_cutoff};
pub use index::{IndexMatch, SimilarityIndex};
pub use stats::{CacheStats, hit_rate};

#[cfg(test)]
pub use clock::mock::ManualClock;
#[cfg(test)]
pub use index::MockSimilarityIndex;
