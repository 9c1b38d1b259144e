use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use super::client::{Neo4jClient, Row, score_column, text_column};
use crate::domain::DomainError;
use crate::domain::retrieval::{Evidence, GraphSearchProvider};
use crate::infrastructure::llm::HttpClientTrait;

static TERM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("term pattern is valid"));

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "what", "who", "whom", "which", "when", "where",
    "why", "how", "does", "did", "has", "have", "had", "with", "from", "that", "this", "these",
    "those", "about", "into", "its", "can", "could", "would", "should", "will", "tell", "give",
    "not", "you", "your", "there", "their", "them", "than", "then", "any", "all",
];

const MAX_TERMS: usize = 8;
const MIN_TERM_LEN: usize = 3;

const KEYWORD_QUERY: &str = "\
UNWIND $terms AS term
MATCH (c:Chunk)
WHERE toLower(c.text) CONTAINS term
WITH c, count(DISTINCT term) AS matched
ORDER BY matched DESC
LIMIT $k
OPTIONAL MATCH (prev:Chunk)-[:NEXT]->(c)
OPTIONAL MATCH (c)-[:NEXT]->(next:Chunk)
OPTIONAL MATCH (d:Document)-[:HAS_CHUNK]->(c)
RETURN c.id AS chunk_id, c.text AS current, prev.text AS prev, next.text AS next,
       d.title AS doc_title, matched
ORDER BY matched DESC";

/// Keyword search over chunks, expanded with neighbouring chunks and the document title
#[derive(Debug)]
pub struct Neo4jGraphSearch<C: HttpClientTrait> {
    client: Arc<Neo4jClient<C>>,
}

impl<C: HttpClientTrait> Neo4jGraphSearch<C> {
    pub fn new(client: Arc<Neo4jClient<C>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClientTrait> GraphSearchProvider for Neo4jGraphSearch<C> {
    async fn search(&self, question: &str, top_k: usize) -> Result<Vec<Evidence>, DomainError> {
        let terms = extract_terms(question);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .client
            .run(
                KEYWORD_QUERY,
                serde_json::json!({
                    "terms": terms,
                    "k": top_k,
                }),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| to_evidence(row, terms.len()))
            .take(top_k)
            .collect())
    }
}

/// Lowercased, deduplicated search terms in order of appearance
pub fn extract_terms(question: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for found in TERM_PATTERN.find_iter(question) {
        let term = found.as_str().to_lowercase();
        if term.chars().count() < MIN_TERM_LEN || STOPWORDS.contains(&term.as_str()) {
            continue;
        }
        if !terms.contains(&term) {
            terms.push(term);
        }
        if terms.len() == MAX_TERMS {
            break;
        }
    }

    terms
}

fn to_evidence(row: &Row, term_count: usize) -> Option<Evidence> {
    let id = text_column(row, "chunk_id")?;
    let current = text_column(row, "current")?;
    let matched = score_column(row, "matched").unwrap_or(0.0);

    let mut text = String::new();
    if let Some(prev) = text_column(row, "prev") {
        text.push_str(&format!("[Previous]: {}\n\n", prev));
    }
    text.push_str(&format!("[Main]: {}", current));
    if let Some(next) = text_column(row, "next") {
        text.push_str(&format!("\n\n[Next]: {}", next));
    }

    let score = (matched / term_count as f32).clamp(0.0, 1.0);
    let evidence = Evidence::graph(id, text, score);

    Some(match text_column(row, "doc_title") {
        Some(title) => evidence.with_title(title),
        None => evidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retrieval::EvidenceOrigin;
    use crate::infrastructure::llm::HttpClient;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use crate::infrastructure::neo4j::Neo4jConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_terms() {
        assert_eq!(
            extract_terms("Who founded Acme, and where is ACME based?"),
            vec!["founded", "acme", "based"]
        );
    }

    #[test]
    fn test_extract_terms_limits_count() {
        let question = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";
        assert_eq!(extract_terms(question).len(), MAX_TERMS);
    }

    #[test]
    fn test_extract_terms_only_stopwords() {
        assert!(extract_terms("What is it?").is_empty());
    }

    #[tokio::test]
    async fn test_search_without_terms_skips_query() {
        let client = Arc::new(Neo4jClient::new(MockHttpClient::new(), &Neo4jConfig::default()));
        let search = Neo4jGraphSearch::new(client);

        assert!(search.search("Who is he?", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_builds_context_and_scores() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(body_partial_json(serde_json::json!({
                "statements": [{"parameters": {"terms": ["founded", "acme"], "k": 3}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "columns": ["chunk_id", "current", "prev", "next", "doc_title", "matched"],
                    "data": [
                        {"row": ["c2", "Alice founded Acme.", "Intro.", "Later years.", "History", 2]},
                        {"row": ["c7", "Acme sells anvils.", null, null, null, 1]}
                    ]
                }],
                "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = Neo4jConfig {
            url: server.uri(),
            ..Neo4jConfig::default()
        };
        let client = Arc::new(Neo4jClient::new(HttpClient::new(), &config));
        let search = Neo4jGraphSearch::new(client);

        let results = search.search("Who founded Acme?", 3).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].origin, EvidenceOrigin::Graph);
        assert_eq!(
            results[0].text,
            "[Previous]: Intro.\n\n[Main]: Alice founded Acme.\n\n[Next]: Later years."
        );
        assert_eq!(results[0].title.as_deref(), Some("History"));
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[1].text, "[Main]: Acme sells anvils.");
        assert_eq!(results[1].score, 0.5);
    }
}
