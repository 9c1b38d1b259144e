//! Read-only access to graph metadata

use std::fmt::Debug;

use async_trait::async_trait;

use super::{ChunkContext, EmbeddingCoverage, GraphSchema, GraphStats};
use crate::domain::DomainError;

/// Inspection queries against the knowledge graph
#[async_trait]
pub trait GraphExplorer: Send + Sync + Debug {
    async fn statistics(&self) -> Result<GraphStats, DomainError>;

    async fn schema(&self) -> Result<GraphSchema, DomainError>;

    async fn embedding_coverage(&self) -> Result<EmbeddingCoverage, DomainError>;

    /// A chunk with its previous and next chunk; `None` if the id is unknown
    async fn chunk_context(&self, chunk_id: &str) -> Result<Option<ChunkContext>, DomainError>;
}
