//! Hybrid retrieval over the vector index and the knowledge graph

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::domain::embedding::Embedding;
use crate::domain::query::{QueryError, QueryStage};
use crate::domain::retrieval::{
    Evidence, GraphSearchProvider, Retrieval, SearchOutcome, SearchStrategy,
    VectorSearchProvider, merge_ranked, rank,
};
use crate::infrastructure::observability::{record_search, record_stage};

/// Runs one or both searches and merges what comes back
#[derive(Debug, Clone)]
pub struct HybridRetriever {
    vector: Arc<dyn VectorSearchProvider>,
    graph: Arc<dyn GraphSearchProvider>,
    vector_timeout: Duration,
    graph_timeout: Duration,
}

impl HybridRetriever {
    pub fn new(
        vector: Arc<dyn VectorSearchProvider>,
        graph: Arc<dyn GraphSearchProvider>,
    ) -> Self {
        Self {
            vector,
            graph,
            vector_timeout: Duration::from_secs(10),
            graph_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeouts(mut self, vector: Duration, graph: Duration) -> Self {
        self.vector_timeout = vector;
        self.graph_timeout = graph;
        self
    }

    /// Vector search only, ranked by similarity
    pub async fn similar(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<Evidence>, QueryError> {
        let outcome = self.search_vector(embedding, top_k).await;
        single_source(outcome, "Vector", top_k)
    }

    /// Retrieve evidence for a question with the given strategy
    pub async fn retrieve(
        &self,
        embedding: &Embedding,
        question: &str,
        top_k: usize,
        strategy: SearchStrategy,
    ) -> Result<Retrieval, QueryError> {
        let start = Instant::now();

        let result = match strategy {
            SearchStrategy::Vector => {
                let outcome = self.search_vector(embedding, top_k).await;
                single_source(outcome, "Vector", top_k).map(Retrieval::new)
            }
            SearchStrategy::Graph => {
                let outcome = self.search_graph(question, top_k).await;
                single_source(outcome, "Graph", top_k).map(Retrieval::new)
            }
            SearchStrategy::Hybrid => {
                let (vector, graph) = tokio::join!(
                    self.search_vector(embedding, top_k),
                    self.search_graph(question, top_k)
                );
                combine(vector, graph, top_k)
            }
        };

        record_stage(QueryStage::Retrieval.as_str(), start.elapsed());
        result
    }

    async fn search_vector(&self, embedding: &Embedding, top_k: usize) -> SearchOutcome {
        let outcome = match tokio::time::timeout(
            self.vector_timeout,
            self.vector.search(embedding, top_k),
        )
        .await
        {
            Ok(Ok(evidence)) => SearchOutcome::Found(evidence),
            Ok(Err(e)) => SearchOutcome::Failed(e.to_string()),
            Err(_) => SearchOutcome::TimedOut(self.vector_timeout),
        };

        log_outcome("vector", &outcome);
        outcome
    }

    async fn search_graph(&self, question: &str, top_k: usize) -> SearchOutcome {
        let outcome = match tokio::time::timeout(
            self.graph_timeout,
            self.graph.search(question, top_k),
        )
        .await
        {
            Ok(Ok(evidence)) => SearchOutcome::Found(evidence),
            Ok(Err(e)) => SearchOutcome::Failed(e.to_string()),
            Err(_) => SearchOutcome::TimedOut(self.graph_timeout),
        };

        log_outcome("graph", &outcome);
        outcome
    }
}

fn log_outcome(source: &str, outcome: &SearchOutcome) {
    match outcome {
        SearchOutcome::Found(evidence) => {
            record_search(source, "success");
            debug!(source, results = evidence.len(), "Search completed");
        }
        SearchOutcome::Failed(error) => {
            record_search(source, "error");
            warn!(source, error = %error, "Search failed");
        }
        SearchOutcome::TimedOut(timeout) => {
            record_search(source, "timeout");
            warn!(source, timeout_ms = timeout.as_millis() as u64, "Search timed out");
        }
    }
}

fn single_source(
    outcome: SearchOutcome,
    source: &str,
    top_k: usize,
) -> Result<Vec<Evidence>, QueryError> {
    match outcome {
        SearchOutcome::Found(evidence) => Ok(rank(evidence, top_k)),
        SearchOutcome::Failed(error) => Err(QueryError::retrieval_unavailable(format!(
            "{} search failed: {}",
            source, error
        ))),
        SearchOutcome::TimedOut(timeout) => Err(QueryError::timeout(
            QueryStage::Retrieval,
            timeout.as_millis() as u64,
        )),
    }
}

fn describe(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::Found(_) => "ok".to_string(),
        SearchOutcome::Failed(error) => error.clone(),
        SearchOutcome::TimedOut(timeout) => format!("timed out after {}ms", timeout.as_millis()),
    }
}

fn combine(vector: SearchOutcome, graph: SearchOutcome, top_k: usize) -> Result<Retrieval, QueryError> {
    match (vector, graph) {
        (SearchOutcome::Found(vector), SearchOutcome::Found(graph)) => {
            Ok(Retrieval::new(merge_ranked(vector, graph, top_k)))
        }
        (SearchOutcome::Found(vector), _) => Ok(Retrieval::new(rank(vector, top_k))
            .with_notice("Graph search unavailable, used vector only")),
        (_, SearchOutcome::Found(graph)) => Ok(Retrieval::new(rank(graph, top_k))
            .with_notice("Vector search unavailable, used graph only")),
        (vector, graph) => Err(QueryError::retrieval_unavailable(format!(
            "vector: {}; graph: {}",
            describe(&vector),
            describe(&graph)
        ))),
    }
}
