//! Neo4j-backed retrieval over the HTTP transaction API

mod client;
mod explorer;
mod graph_search;
mod vector_search;

pub use client::{Neo4jClient, Neo4jConfig, Row};
pub use explorer::Neo4jGraphExplorer;
pub use graph_search::{Neo4jGraphSearch, extract_terms};
pub use vector_search::Neo4jVectorSearch;
