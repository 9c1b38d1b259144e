//! Merging and ranking evidence from several sources

use std::collections::HashMap;
use std::time::Duration;

use super::Evidence;

/// How one search side ended
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Found(Vec<Evidence>),
    Failed(String),
    TimedOut(Duration),
}

/// Evidence chosen for a query plus any degradation notices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    pub evidence: Vec<Evidence>,
    pub notices: Vec<String>,
}

impl Retrieval {
    pub fn new(evidence: Vec<Evidence>) -> Self {
        Self {
            evidence,
            notices: Vec::new(),
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notices.push(notice.into());
        self
    }

    /// True when at least one source was skipped
    pub fn is_degraded(&self) -> bool {
        !self.notices.is_empty()
    }
}

/// Sort by descending score and keep the first `top_k`
///
/// The sort is stable, so equal scores keep their input order.
pub fn rank(mut evidence: Vec<Evidence>, top_k: usize) -> Vec<Evidence> {
    evidence.sort_by(|a, b| b.score.total_cmp(&a.score));
    evidence.truncate(top_k);
    evidence
}

/// Union of vector and graph evidence, deduplicated by source id
///
/// A duplicate keeps the occurrence with the higher score (and its origin).
/// On equal scores the vector occurrence wins.
pub fn merge_ranked(vector: Vec<Evidence>, graph: Vec<Evidence>, top_k: usize) -> Vec<Evidence> {
    let mut merged: Vec<Evidence> = Vec::with_capacity(vector.len() + graph.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in vector.into_iter().chain(graph) {
        match positions.get(&item.source_id) {
            Some(&index) => {
                if item.score > merged[index].score {
                    merged[index] = item;
                }
            }
            None => {
                positions.insert(item.source_id.clone(), merged.len());
                merged.push(item);
            }
        }
    }

    rank(merged, top_k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::retrieval::EvidenceOrigin;

    fn ids(evidence: &[Evidence]) -> Vec<&str> {
        evidence.iter().map(|e| e.source_id.as_str()).collect()
    }

    #[test]
    fn test_merge_keeps_higher_score() {
        let vector = vec![Evidence::vector("id1", "a", 0.9), Evidence::vector("id2", "b", 0.7)];
        let graph = vec![Evidence::graph("id2", "b", 0.8), Evidence::graph("id3", "c", 0.6)];

        let merged = merge_ranked(vector, graph, 3);

        assert_eq!(ids(&merged), vec!["id1", "id2", "id3"]);
        assert_eq!(merged[1].score, 0.8);
        assert_eq!(merged[1].origin, EvidenceOrigin::Graph);
        assert_eq!(merged[2].score, 0.6);
    }

    #[test]
    fn test_merge_truncates() {
        let vector = vec![Evidence::vector("a", "", 0.5), Evidence::vector("b", "", 0.4)];
        let graph = vec![Evidence::graph("c", "", 0.9)];

        let merged = merge_ranked(vector, graph, 2);

        assert_eq!(ids(&merged), vec!["c", "a"]);
    }

    #[test]
    fn test_merge_tie_keeps_vector() {
        let merged = merge_ranked(
            vec![Evidence::vector("x", "", 0.5)],
            vec![Evidence::graph("x", "", 0.5)],
            5,
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].origin, EvidenceOrigin::Vector);
    }

    #[test]
    fn test_rank_is_stable() {
        let ranked = rank(
            vec![
                Evidence::graph("first", "", 0.5),
                Evidence::graph("second", "", 0.5),
                Evidence::graph("top", "", 0.7),
            ],
            3,
        );

        assert_eq!(ids(&ranked), vec!["top", "first", "second"]);
    }

    #[test]
    fn test_merge_empty_sides() {
        assert!(merge_ranked(vec![], vec![], 3).is_empty());
    }

    #[test]
    fn test_retrieval_degraded() {
        let retrieval = Retrieval::new(vec![]).with_notice("Graph search unavailable");
        assert!(retrieval.is_degraded());
        assert!(!Retrieval::new(vec![]).is_degraded());
    }
}
