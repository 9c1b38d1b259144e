//! Graph inspection domain - statistics, schema and chunk neighbourhoods

mod explorer;
mod stats;

pub use explorer::GraphExplorer;
pub use stats::{ChunkContext, EmbeddingCoverage, GraphSchema, GraphStats, SchemaItem};

#[cfg(test)]
pub use explorer::mock::MockGraphExplorer;
