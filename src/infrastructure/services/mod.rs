//! Infrastructure services

mod hybrid_retriever;
mod query_orchestrator;
mod semantic_cache_service;

pub use hybrid_retriever::HybridRetriever;
pub use query_orchestrator::{QueryOrchestrator, StageTimeouts};
pub use semantic_cache_service::{CacheHealth, CacheHit, CacheLookup, SemanticCacheService};
