//! Similarity index trait - the storage behind the semantic cache

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use super::CacheEntry;
use crate::domain::DomainError;
use crate::domain::embedding::Embedding;

/// The closest live entry to a key embedding
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub entry: CacheEntry,
    pub similarity: f32,
}

/// Bounded nearest-neighbour store of cache entries
///
/// `cutoff` arguments are expiry cutoffs: entries created at or before them
/// are treated as absent. Embeddings whose dimension differs from the index
/// fail with `InvalidEmbedding` and leave the index unchanged.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Most similar live entry with similarity >= `min_similarity`
    ///
    /// Ties go to the most recently created entry.
    async fn nearest(
        &self,
        embedding: &Embedding,
        min_similarity: f32,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<IndexMatch>, DomainError>;

    /// Insert an entry, evicting the least recently accessed one when full
    async fn insert(&self, entry: CacheEntry) -> Result<Option<CacheEntry>, DomainError>;

    /// Remove an entry by id
    async fn remove(&self, id: &str) -> Result<bool, DomainError>;

    /// Record a hit on an entry, returning its updated state
    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<Option<CacheEntry>, DomainError>;

    /// Drop every entry created at or before `cutoff`
    async fn remove_expired(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Number of entries created after `cutoff`
    async fn live_count(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Remove all entries
    async fn clear(&self) -> Result<(), DomainError>;

    /// Name of the storage backend
    fn backend_name(&self) -> &'static str;
}
