//! Read-only views of the knowledge graph

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Node and relationship counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Count per primary node label
    pub nodes: BTreeMap<String, u64>,
    /// Count per relationship type
    pub relationships: BTreeMap<String, u64>,
    pub total_documents: u64,
    pub total_chunks: u64,
}

impl GraphStats {
    pub fn new(nodes: BTreeMap<String, u64>, relationships: BTreeMap<String, u64>) -> Self {
        let total_documents = nodes.get("Document").copied().unwrap_or(0);
        let total_chunks = nodes.get("Chunk").copied().unwrap_or(0);

        Self {
            nodes,
            relationships,
            total_documents,
            total_chunks,
        }
    }
}

/// A named constraint or index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaItem {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub constraints: Vec<SchemaItem>,
    pub indexes: Vec<SchemaItem>,
}

/// How many chunks carry an embedding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingCoverage {
    pub total_chunks: u64,
    pub chunks_with_embeddings: u64,
    pub chunks_without_embeddings: u64,
    /// Percentage rounded to two decimals; 0 for an empty graph
    pub coverage_percentage: f64,
}

impl EmbeddingCoverage {
    pub fn new(total_chunks: u64, chunks_with_embeddings: u64) -> Self {
        let with = chunks_with_embeddings.min(total_chunks);
        let coverage_percentage = if total_chunks == 0 {
            0.0
        } else {
            (with as f64 / total_chunks as f64 * 10_000.0).round() / 100.0
        };

        Self {
            total_chunks,
            chunks_with_embeddings: with,
            chunks_without_embeddings: total_chunks - with,
            coverage_percentage,
        }
    }
}

/// A chunk with its neighbours and parent document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkContext {
    pub chunk_id: String,
    pub current: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub document_title: Option<String>,
    pub document_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_totals_from_labels() {
        let nodes = BTreeMap::from([
            ("Document".to_string(), 2),
            ("Chunk".to_string(), 40),
            ("Entity".to_string(), 7),
        ]);

        let stats = GraphStats::new(nodes, BTreeMap::new());

        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.total_chunks, 40);
        assert_eq!(GraphStats::new(BTreeMap::new(), BTreeMap::new()).total_chunks, 0);
    }

    #[test]
    fn test_coverage_rounding() {
        let coverage = EmbeddingCoverage::new(3, 2);

        assert_eq!(coverage.chunks_without_embeddings, 1);
        assert_eq!(coverage.coverage_percentage, 66.67);
        assert_eq!(EmbeddingCoverage::new(0, 0).coverage_percentage, 0.0);
        assert_eq!(EmbeddingCoverage::new(4, 4).coverage_percentage, 100.0);
    }

    #[test]
    fn test_schema_item_serializes_type() {
        let item = SchemaItem {
            name: "chunk_embeddings".to_string(),
            kind: "VECTOR".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            serde_json::json!({"name": "chunk_embeddings", "type": "VECTOR"})
        );
    }
}
