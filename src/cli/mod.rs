//! CLI module for the Graph RAG gateway
//!
//! - `serve`: run the HTTP API
//! - `ask`: answer one question and print the trace

pub mod ask;
pub mod serve;

use clap::{Parser, Subcommand};

/// Graph RAG Gateway - hybrid vector/graph question answering with semantic caching
#[derive(Parser)]
#[command(name = "graph-rag-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Answer a single question
    Ask(ask::AskArgs),
}
