//! Application state shared by the handlers

use std::sync::Arc;

use crate::domain::graph::GraphExplorer;
use crate::infrastructure::services::QueryOrchestrator;

/// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<QueryOrchestrator>,
    pub graph: Arc<dyn GraphExplorer>,
}

impl AppState {
    pub fn new(orchestrator: Arc<QueryOrchestrator>, graph: Arc<dyn GraphExplorer>) -> Self {
        Self {
            orchestrator,
            graph,
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::generation::MockGenerationProvider;
    use crate::domain::graph::MockGraphExplorer;
    use crate::domain::retrieval::{Evidence, MockSearchProvider};
    use crate::domain::semantic_cache::SemanticCacheConfig;
    use crate::infrastructure::semantic_cache::InMemorySimilarityIndex;
    use crate::infrastructure::services::{HybridRetriever, SemanticCacheService};

    /// State wired to in-process fakes
    pub fn test_state() -> AppState {
        state_with(
            MockSearchProvider::new(vec![
                Evidence::vector("c1", "Acme was founded by Alice.", 0.9),
                Evidence::vector("c2", "Acme makes anvils.", 0.7),
            ]),
            MockGenerationProvider::new("Alice founded Acme."),
        )
    }

    pub fn state_with(vector: MockSearchProvider, generator: MockGenerationProvider) -> AppState {
        let graph = MockSearchProvider::new(vec![Evidence::graph(
            "c3",
            "Alice lives in Paris.",
            0.6,
        )]);
        let retriever = HybridRetriever::new(Arc::new(vector), Arc::new(graph));
        let cache = Arc::new(SemanticCacheService::new(
            Arc::new(InMemorySimilarityIndex::new(100)),
            SemanticCacheConfig::default(),
        ));

        let orchestrator = QueryOrchestrator::new(
            Arc::new(MockEmbeddingProvider::new(32)),
            retriever,
            Arc::new(generator),
            cache,
        );

        AppState::new(Arc::new(orchestrator), Arc::new(MockGraphExplorer::new()))
    }
}
