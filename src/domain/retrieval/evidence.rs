//! Evidence snippets returned by retrieval

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which search produced a piece of evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceOrigin {
    Vector,
    Graph,
}

impl fmt::Display for EvidenceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Graph => write!(f, "graph"),
        }
    }
}

/// A retrieved text snippet with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub source_id: String,
    pub text: String,
    pub score: f32,
    pub origin: EvidenceOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Evidence {
    pub fn new(
        source_id: impl Into<String>,
        text: impl Into<String>,
        score: f32,
        origin: EvidenceOrigin,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            score,
            origin,
            title: None,
        }
    }

    pub fn vector(source_id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self::new(source_id, text, score, EvidenceOrigin::Vector)
    }

    pub fn graph(source_id: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self::new(source_id, text, score, EvidenceOrigin::Graph)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_serialization() {
        let evidence = Evidence::graph("chunk-1", "Alice founded Acme", 0.5).with_title("Acme");

        let json = serde_json::to_value(&evidence).unwrap();

        assert_eq!(json["origin"], "graph");
        assert_eq!(json["title"], "Acme");
        assert_eq!(json["source_id"], "chunk-1");
    }

    #[test]
    fn test_title_omitted_when_absent() {
        let json = serde_json::to_value(Evidence::vector("c", "t", 0.1)).unwrap();
        assert!(json.get("title").is_none());
    }
}
