//! Similarity index backends and the in-flight fill registry

mod in_memory;
mod redis;
mod single_flight;

pub use in_memory::InMemorySimilarityIndex;
#[cfg(test)]
pub use in_memory::mock::SlowInsertIndex;
pub use redis::{RedisIndexConfig, RedisSimilarityIndex};
pub use single_flight::{FillClaim, FillPermit, FillRegistry, FillWaiter};
