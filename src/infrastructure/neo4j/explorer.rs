use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::client::{Neo4jClient, Row, count_column, text_column};
use crate::domain::DomainError;
use crate::domain::graph::{
    ChunkContext, EmbeddingCoverage, GraphExplorer, GraphSchema, GraphStats, SchemaItem,
};
use crate::infrastructure::llm::HttpClientTrait;

const NODE_COUNTS: &str = "\
MATCH (n)
RETURN labels(n)[0] AS label, count(n) AS count
ORDER BY count DESC";

const RELATIONSHIP_COUNTS: &str = "\
MATCH ()-[r]->()
RETURN type(r) AS type, count(r) AS count
ORDER BY count DESC";

const LABELS: &str = "CALL db.labels() YIELD label RETURN collect(label) AS labels";

const RELATIONSHIP_TYPES: &str = "\
CALL db.relationshipTypes() YIELD relationshipType
RETURN collect(relationshipType) AS types";

const CONSTRAINTS: &str = "\
SHOW CONSTRAINTS YIELD name, type
RETURN collect({name: name, type: type}) AS items";

const INDEXES: &str = "\
SHOW INDEXES YIELD name, type
RETURN collect({name: name, type: type}) AS items";

const EMBEDDING_COVERAGE: &str = "\
MATCH (c:Chunk)
RETURN count(c) AS total_chunks, count(c.embedding) AS chunks_with_embeddings";

const CHUNK_CONTEXT: &str = "\
MATCH (c:Chunk {id: $chunk_id})
OPTIONAL MATCH (prev:Chunk)-[:NEXT]->(c)
OPTIONAL MATCH (c)-[:NEXT]->(next:Chunk)
OPTIONAL MATCH (d:Document)-[:HAS_CHUNK]->(c)
RETURN c.text AS current, c.position AS position, prev.text AS previous,
       next.text AS next, d.title AS document_title, d.id AS document_id
LIMIT 1";

/// Graph statistics, schema and chunk neighbourhoods read through Cypher
#[derive(Debug)]
pub struct Neo4jGraphExplorer<C: HttpClientTrait> {
    client: Arc<Neo4jClient<C>>,
}

impl<C: HttpClientTrait> Neo4jGraphExplorer<C> {
    pub fn new(client: Arc<Neo4jClient<C>>) -> Self {
        Self { client }
    }
}

fn counts_by(rows: &[Row], key: &str) -> BTreeMap<String, u64> {
    rows.iter()
        .filter_map(|row| Some((text_column(row, key)?, count_column(row, "count"))))
        .collect()
}

fn first_row(results: &[Vec<Row>], statement: usize) -> Option<&Row> {
    results.get(statement).and_then(|rows| rows.first())
}

fn string_list(row: Option<&Row>, column: &str) -> Vec<String> {
    row.and_then(|row| row.get(column))
        .and_then(serde_json::Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn schema_items(row: Option<&Row>) -> Vec<SchemaItem> {
    row.and_then(|row| row.get("items"))
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

#[async_trait]
impl<C: HttpClientTrait> GraphExplorer for Neo4jGraphExplorer<C> {
    async fn statistics(&self) -> Result<GraphStats, DomainError> {
        let results = self
            .client
            .run_all(&[
                (NODE_COUNTS, serde_json::json!({})),
                (RELATIONSHIP_COUNTS, serde_json::json!({})),
            ])
            .await?;

        let nodes = results.first().map(|rows| counts_by(rows, "label"));
        let relationships = results.get(1).map(|rows| counts_by(rows, "type"));

        Ok(GraphStats::new(
            nodes.unwrap_or_default(),
            relationships.unwrap_or_default(),
        ))
    }

    async fn schema(&self) -> Result<GraphSchema, DomainError> {
        let results = self
            .client
            .run_all(&[
                (LABELS, serde_json::json!({})),
                (RELATIONSHIP_TYPES, serde_json::json!({})),
                (CONSTRAINTS, serde_json::json!({})),
                (INDEXES, serde_json::json!({})),
            ])
            .await?;

        Ok(GraphSchema {
            node_labels: string_list(first_row(&results, 0), "labels"),
            relationship_types: string_list(first_row(&results, 1), "types"),
            constraints: schema_items(first_row(&results, 2)),
            indexes: schema_items(first_row(&results, 3)),
        })
    }

    async fn embedding_coverage(&self) -> Result<EmbeddingCoverage, DomainError> {
        let rows = self
            .client
            .run(EMBEDDING_COVERAGE, serde_json::json!({}))
            .await?;

        Ok(match rows.first() {
            Some(row) => EmbeddingCoverage::new(
                count_column(row, "total_chunks"),
                count_column(row, "chunks_with_embeddings"),
            ),
            None => EmbeddingCoverage::new(0, 0),
        })
    }

    async fn chunk_context(&self, chunk_id: &str) -> Result<Option<ChunkContext>, DomainError> {
        let rows = self
            .client
            .run(CHUNK_CONTEXT, serde_json::json!({ "chunk_id": chunk_id }))
            .await?;

        Ok(rows.first().map(|row| ChunkContext {
            chunk_id: chunk_id.to_string(),
            current: text_column(row, "current").unwrap_or_default(),
            position: row.get("position").and_then(serde_json::Value::as_i64),
            previous: text_column(row, "previous"),
            next: text_column(row, "next"),
            document_title: text_column(row, "document_title"),
            document_id: text_column(row, "document_id"),
        }))
    }
}
