//! Graph RAG Gateway
//!
//! Answers questions from a hybrid vector + graph knowledge store:
//! - Semantic cache keyed by question embeddings, with single-flight fills
//! - Vector, graph or hybrid retrieval with graceful degradation
//! - Ollama generation and embeddings, Neo4j retrieval
//! - In-memory or Redis cache storage

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use api::state::AppState;
use config::CacheBackend;
use domain::semantic_cache::SimilarityIndex;
use infrastructure::{
    embedding::OllamaEmbeddingProvider,
    llm::{HttpClient, OllamaProvider},
    neo4j::{Neo4jClient, Neo4jGraphExplorer, Neo4jGraphSearch, Neo4jVectorSearch},
    semantic_cache::{InMemorySimilarityIndex, RedisSimilarityIndex},
    services::{HybridRetriever, QueryOrchestrator, SemanticCacheService},
};

/// Wire the orchestrator and its collaborators from configuration
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let timeouts = &config.timeouts;
    let http = HttpClient::with_timeout(longest_timeout(config))?;

    let embedder = Arc::new(OllamaEmbeddingProvider::new(http.clone(), &config.ollama));
    let generator = Arc::new(OllamaProvider::new(http.clone(), &config.ollama));
    info!(
        base_url = %config.ollama.base_url,
        model = %config.ollama.model,
        embedding_model = %config.ollama.embedding_model,
        "Ollama providers configured"
    );

    let neo4j = Arc::new(Neo4jClient::new(http, &config.neo4j));
    let retriever = HybridRetriever::new(
        Arc::new(Neo4jVectorSearch::new(neo4j.clone(), &config.neo4j.vector_index)),
        Arc::new(Neo4jGraphSearch::new(neo4j.clone())),
    )
    .with_timeouts(timeouts.vector_search(), timeouts.graph_search());
    info!(url = %config.neo4j.url, database = %config.neo4j.database, "Neo4j retrieval configured");

    let index = create_index(config).await?;
    let cache = Arc::new(SemanticCacheService::new(index, config.cache.clone()));
    info!(
        backend = ?config.cache_backend,
        enabled = config.cache.enabled,
        threshold = config.cache.similarity_threshold,
        max_entries = config.cache.max_entries,
        ttl_secs = config.cache.ttl_secs,
        "Semantic cache configured"
    );

    let orchestrator = QueryOrchestrator::new(embedder, retriever, generator, cache)
        .with_defaults(config.retrieval.clone())
        .with_timeouts(timeouts.clone());

    let explorer = Arc::new(Neo4jGraphExplorer::new(neo4j));

    Ok(AppState::new(Arc::new(orchestrator), explorer))
}

async fn create_index(config: &AppConfig) -> anyhow::Result<Arc<dyn SimilarityIndex>> {
    let cache = &config.cache;

    let index: Arc<dyn SimilarityIndex> = match config.cache_backend {
        CacheBackend::Memory => Arc::new(
            InMemorySimilarityIndex::new(cache.max_entries)
                .with_dimensions(cache.embedding_dimension),
        ),
        CacheBackend::Redis => {
            info!(namespace = %config.redis.namespace, "Connecting to Redis cache backend");
            Arc::new(
                RedisSimilarityIndex::new(
                    config.redis.clone(),
                    cache.max_entries,
                    cache.embedding_dimension,
                )
                .await?,
            )
        }
    };

    Ok(index)
}

/// Start the background TTL sweeper when caching is on and an interval is set
pub fn start_expiry_sweeper(state: &AppState, config: &AppConfig) -> Option<JoinHandle<()>> {
    if !config.cache.enabled {
        return None;
    }

    let interval = config.cache.sweep_interval()?;
    info!(interval_secs = interval.as_secs(), "Starting cache expiry sweeper");

    Some(state.orchestrator.cache().clone().spawn_expiry_sweeper(interval))
}

/// Upper bound for any single HTTP call; stage timeouts are enforced separately
fn longest_timeout(config: &AppConfig) -> Duration {
    let timeouts = &config.timeouts;
    [
        timeouts.embedding_ms,
        timeouts.vector_search_ms,
        timeouts.graph_search_ms,
        timeouts.generation_ms,
    ]
    .into_iter()
    .max()
    .map(Duration::from_millis)
    .unwrap_or(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_timeout() {
        let mut config = AppConfig::default();
        config.timeouts.generation_ms = 90_000;

        assert_eq!(longest_timeout(&config), Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_create_app_state_with_memory_backend() {
        let state = create_app_state(&AppConfig::default()).await.unwrap();

        let stats = state.orchestrator.cache_stats().await;
        assert_eq!(stats.cache_size, 0);
        assert_eq!(stats.max_cache_size, 10_000);
        assert_eq!(state.orchestrator.cache_health().await.backend, "memory");
    }

    #[tokio::test]
    async fn test_sweeper_respects_config() {
        let mut config = AppConfig::default();
        let state = create_app_state(&config).await.unwrap();

        let handle = start_expiry_sweeper(&state, &config);
        assert!(handle.is_some());
        if let Some(handle) = handle {
            handle.abort();
        }

        config.cache.sweep_interval_secs = 0;
        assert!(start_expiry_sweeper(&state, &config).is_none());
    }
}
