//! Ask command - answer one question from the terminal

use anyhow::Context;
use clap::Args;

use crate::config::AppConfig;
use crate::domain::query::{QueryRequest, QueryResult};
use crate::domain::retrieval::SearchStrategy;
use crate::infrastructure::logging;

#[derive(Debug, Args)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Number of evidence chunks to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Retrieval strategy: vector, graph or hybrid
    #[arg(long)]
    pub strategy: Option<SearchStrategy>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the ask command
pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    let state = crate::create_app_state(&config).await?;

    let mut request = QueryRequest::new(args.question);
    request.top_k = args.top_k;
    request.strategy = args.strategy;

    let result = state
        .orchestrator
        .answer_question(request)
        .await
        .map_err(|e| anyhow::anyhow!("{} (stage: {})", e, e.stage()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render(&result));
    }

    Ok(())
}

fn render(result: &QueryResult) -> String {
    let mut out = format!("{}\n\n", result.answer);

    match result.similarity {
        Some(similarity) if result.cached => {
            out.push_str(&format!("(cached, similarity {:.3})\n", similarity));
        }
        _ => out.push_str(&format!("(strategy: {})\n", result.strategy)),
    }

    out.push_str("\nSteps:\n");
    for step in &result.steps {
        out.push_str(&format!("  - {}\n", step));
    }

    if !result.evidence.is_empty() {
        out.push_str("\nEvidence:\n");
        for (index, item) in result.evidence.iter().enumerate() {
            out.push_str(&format!(
                "  [{}] {} ({}, {:.3})\n",
                index + 1,
                item.source_id,
                item.origin,
                item.score
            ));
        }
    }

    out
}
