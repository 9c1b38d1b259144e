//! Retrieval domain - evidence, strategies and search provider boundaries

mod evidence;
mod merge;
mod provider;
mod strategy;

pub use evidence::{Evidence, EvidenceOrigin};
pub use merge::{Retrieval, SearchOutcome, merge_ranked, rank};
pub use provider::{GraphSearchProvider, VectorSearchProvider};
pub use strategy::SearchStrategy;

#[cfg(test)]
pub use provider::mock::MockSearchProvider;
