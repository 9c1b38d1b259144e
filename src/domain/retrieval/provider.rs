//! Search provider traits for the two knowledge sources

use async_trait::async_trait;
use std::fmt::Debug;

use super::Evidence;
use crate::domain::DomainError;
use crate::domain::embedding::Embedding;

/// Similarity search over chunk embeddings
#[async_trait]
pub trait VectorSearchProvider: Send + Sync + Debug {
    /// Return up to `top_k` chunks ordered by descending similarity
    async fn search(&self, embedding: &Embedding, top_k: usize)
    -> Result<Vec<Evidence>, DomainError>;
}

/// Structural search over the knowledge graph
#[async_trait]
pub trait GraphSearchProvider: Send + Sync + Debug {
    /// Return up to `top_k` chunks ordered by the graph's relevance score
    async fn search(&self, question: &str, top_k: usize) -> Result<Vec<Evidence>, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Canned search results, usable as either provider
    #[derive(Debug, Default)]
    pub struct MockSearchProvider {
        results: Vec<Evidence>,
        error: Option<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockSearchProvider {
        pub fn new(results: Vec<Evidence>) -> Self {
            Self {
                results,
                ..Default::default()
            }
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn respond(&self, top_k: usize) -> Result<Vec<Evidence>, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider("mock-search", error));
            }

            Ok(self.results.iter().take(top_k).cloned().collect())
        }
    }

    #[async_trait]
    impl VectorSearchProvider for MockSearchProvider {
        async fn search(
            &self,
            _embedding: &Embedding,
            top_k: usize,
        ) -> Result<Vec<Evidence>, DomainError> {
            self.respond(top_k).await
        }
    }

    #[async_trait]
    impl GraphSearchProvider for MockSearchProvider {
        async fn search(&self, _question: &str, top_k: usize) -> Result<Vec<Evidence>, DomainError> {
            self.respond(top_k).await
        }
    }
}
