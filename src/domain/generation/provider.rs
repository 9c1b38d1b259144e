//! Answer generation provider trait

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;
use crate::domain::retrieval::Evidence;

/// Trait for language models that answer a question from evidence
#[async_trait]
pub trait GenerationProvider: Send + Sync + Debug {
    /// Produce an answer grounded in the given evidence
    async fn generate(&self, question: &str, evidence: &[Evidence]) -> Result<String, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
