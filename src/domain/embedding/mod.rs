//! Embedding domain - vectors and the embedding provider boundary

mod provider;
mod vector;

pub use provider::EmbeddingProvider;
pub use vector::{Embedding, cosine_similarity};

#[cfg(test)]
pub use provider::mock::MockEmbeddingProvider;
