//! Retrieval strategy selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::DomainError;

/// Which knowledge sources a query consults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    Vector,
    Graph,
    #[default]
    Hybrid,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Graph => "graph",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn uses_vector(&self) -> bool {
        matches!(self, Self::Vector | Self::Hybrid)
    }

    pub fn uses_graph(&self) -> bool {
        matches!(self, Self::Graph | Self::Hybrid)
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vector" => Ok(Self::Vector),
            "graph" => Ok(Self::Graph),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(DomainError::validation(format!(
                "Unknown search strategy '{}', expected vector, graph or hybrid",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_hybrid() {
        assert_eq!(SearchStrategy::default(), SearchStrategy::Hybrid);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Vector".parse::<SearchStrategy>().unwrap(), SearchStrategy::Vector);
        assert_eq!(" graph ".parse::<SearchStrategy>().unwrap(), SearchStrategy::Graph);
        assert!("fulltext".parse::<SearchStrategy>().is_err());
    }

    #[test]
    fn test_sources() {
        assert!(SearchStrategy::Hybrid.uses_vector() && SearchStrategy::Hybrid.uses_graph());
        assert!(!SearchStrategy::Vector.uses_graph());
        assert!(!SearchStrategy::Graph.uses_vector());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&SearchStrategy::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");
    }
}
