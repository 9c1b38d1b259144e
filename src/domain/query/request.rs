//! Query request and result types

use serde::{Deserialize, Serialize};

use crate::domain::retrieval::{Evidence, SearchStrategy};

/// A question to answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub strategy: Option<SearchStrategy>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
            strategy: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Defaults applied to requests that leave options unset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDefaults {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Requested `top_k` values above this are clamped
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    #[serde(default)]
    pub default_strategy: SearchStrategy,
}

fn default_top_k() -> usize {
    3
}

fn default_max_top_k() -> usize {
    10
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            default_strategy: SearchStrategy::default(),
        }
    }
}

/// The answer to a question, with the steps that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub question: String,
    pub answer: String,
    pub evidence: Vec<Evidence>,
    pub strategy: SearchStrategy,
    pub steps: Vec<String>,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    /// The question the cached answer was originally computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
}
