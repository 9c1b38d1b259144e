use std::sync::Arc;

use async_trait::async_trait;

use super::client::{Neo4jClient, score_column, text_column};
use crate::domain::DomainError;
use crate::domain::embedding::Embedding;
use crate::domain::retrieval::{Evidence, VectorSearchProvider};
use crate::infrastructure::llm::HttpClientTrait;

const VECTOR_QUERY: &str = "\
CALL db.index.vector.queryNodes($index, $k, $embedding)
YIELD node, score
OPTIONAL MATCH (d:Document)-[:HAS_CHUNK]->(node)
RETURN node.id AS chunk_id, node.text AS text, score, d.title AS doc_title
ORDER BY score DESC";

/// Vector similarity search over the chunk embedding index
#[derive(Debug)]
pub struct Neo4jVectorSearch<C: HttpClientTrait> {
    client: Arc<Neo4jClient<C>>,
    index: String,
}

impl<C: HttpClientTrait> Neo4jVectorSearch<C> {
    pub fn new(client: Arc<Neo4jClient<C>>, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClientTrait> VectorSearchProvider for Neo4jVectorSearch<C> {
    async fn search(&self, embedding: &Embedding, top_k: usize) -> Result<Vec<Evidence>, DomainError> {
        let rows = self
            .client
            .run(
                VECTOR_QUERY,
                serde_json::json!({
                    "index": self.index,
                    "k": top_k,
                    "embedding": embedding.as_slice(),
                }),
            )
            .await?;

        let evidence = rows
            .iter()
            .filter_map(|row| {
                let id = text_column(row, "chunk_id")?;
                let text = text_column(row, "text")?;
                let score = score_column(row, "score").unwrap_or(0.0);

                let item = Evidence::vector(id, text, score);
                Some(match text_column(row, "doc_title") {
                    Some(title) => item.with_title(title),
                    None => item,
                })
            })
            .take(top_k)
            .collect();

        Ok(evidence)
    }
}
