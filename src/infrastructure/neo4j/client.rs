//! Minimal client for the Neo4j HTTP transaction endpoint

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DomainError;
use crate::infrastructure::llm::HttpClientTrait;

/// Neo4j connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// HTTP endpoint, not the bolt URI
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_vector_index")]
    pub vector_index: String,
}

fn default_url() -> String {
    "http://localhost:7474".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_vector_index() -> String {
    "chunk_embeddings".to_string()
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            user: default_user(),
            password: String::new(),
            database: default_database(),
            vector_index: default_vector_index(),
        }
    }
}

/// One result row, keyed by column name
pub type Row = HashMap<String, serde_json::Value>;

/// Runs Cypher statements in auto-commit transactions
#[derive(Debug)]
pub struct Neo4jClient<C: HttpClientTrait> {
    client: C,
    commit_url: String,
    auth_header: String,
}

impl<C: HttpClientTrait> Neo4jClient<C> {
    pub fn new(client: C, config: &Neo4jConfig) -> Self {
        let credentials = STANDARD.encode(format!("{}:{}", config.user, config.password));

        Self {
            client,
            commit_url: format!(
                "{}/db/{}/tx/commit",
                config.url.trim_end_matches('/'),
                config.database
            ),
            auth_header: format!("Basic {}", credentials),
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
            ("Accept", "application/json"),
        ]
    }

    /// Execute a statement and return its rows
    pub async fn run(
        &self,
        statement: &str,
        parameters: serde_json::Value,
    ) -> Result<Vec<Row>, DomainError> {
        let mut results = self.run_all(&[(statement, parameters)]).await?;
        Ok(results.pop().unwrap_or_default())
    }

    /// Execute several statements in one transaction, rows per statement
    pub async fn run_all(
        &self,
        statements: &[(&str, serde_json::Value)],
    ) -> Result<Vec<Vec<Row>>, DomainError> {
        let statements: Vec<serde_json::Value> = statements
            .iter()
            .map(|(statement, parameters)| {
                serde_json::json!({
                    "statement": statement,
                    "parameters": parameters,
                })
            })
            .collect();
        let body = serde_json::json!({ "statements": statements });

        let response = self
            .client
            .post_json(&self.commit_url, self.headers(), &body)
            .await?;

        let results = parse_results(response)?;
        debug!(statements = results.len(), "Cypher statements executed");
        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

fn parse_results(json: serde_json::Value) -> Result<Vec<Vec<Row>>, DomainError> {
    let response: TxResponse = serde_json::from_value(json).map_err(|e| {
        DomainError::provider("neo4j", format!("Failed to parse response: {}", e))
    })?;

    if let Some(error) = response.errors.first() {
        return Err(DomainError::provider(
            "neo4j",
            format!("{}: {}", error.code, error.message),
        ));
    }

    Ok(response
        .results
        .into_iter()
        .map(|result| {
            result
                .data
                .into_iter()
                .map(|data| result.columns.iter().cloned().zip(data.row).collect())
                .collect()
        })
        .collect())
}

/// Read a column as text; numeric ids are rendered as strings
pub(crate) fn text_column(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub(crate) fn score_column(row: &Row, column: &str) -> Option<f32> {
    row.get(column)?.as_f64().map(|v| v as f32)
}

pub(crate) fn count_column(row: &Row, column: &str) -> u64 {
    row.get(column).and_then(serde_json::Value::as_u64).unwrap_or(0)
}
