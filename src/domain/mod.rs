//! Domain layer - core types, traits and the query state machine

pub mod embedding;
mod error;
pub mod generation;
pub mod graph;
pub mod query;
pub mod retrieval;
pub mod semantic_cache;

pub use error::DomainError;
