//! Query orchestration
//!
//! Drives a [`QueryMachine`] through its states, performing the external
//! calls it asks for under per-stage timeouts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::semantic_cache_service::{CacheHealth, CacheHit, CacheLookup, SemanticCacheService};
use super::HybridRetriever;
use crate::domain::DomainError;
use crate::domain::embedding::{Embedding, EmbeddingProvider};
use crate::domain::generation::GenerationProvider;
use crate::domain::query::{
    QueryAction, QueryDefaults, QueryError, QueryMachine, QueryRequest, QueryResult, QueryStage,
    StepOutcome,
};
use crate::domain::retrieval::Evidence;
use crate::domain::semantic_cache::{CacheStats, CachedAnswer};
use crate::infrastructure::observability::{record_query, record_stage};
use crate::infrastructure::semantic_cache::FillPermit;

/// Timeouts for each external dependency, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_embedding_ms")]
    pub embedding_ms: u64,
    #[serde(default = "default_search_ms")]
    pub vector_search_ms: u64,
    #[serde(default = "default_search_ms")]
    pub graph_search_ms: u64,
    #[serde(default = "default_generation_ms")]
    pub generation_ms: u64,
    #[serde(default = "default_cache_ms")]
    pub cache_ms: u64,
}

fn default_embedding_ms() -> u64 {
    10_000
}

fn default_search_ms() -> u64 {
    10_000
}

fn default_generation_ms() -> u64 {
    60_000
}

fn default_cache_ms() -> u64 {
    2_000
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            embedding_ms: default_embedding_ms(),
            vector_search_ms: default_search_ms(),
            graph_search_ms: default_search_ms(),
            generation_ms: default_generation_ms(),
            cache_ms: default_cache_ms(),
        }
    }
}

impl StageTimeouts {
    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }

    pub fn vector_search(&self) -> Duration {
        Duration::from_millis(self.vector_search_ms)
    }

    pub fn graph_search(&self) -> Duration {
        Duration::from_millis(self.graph_search_ms)
    }

    pub fn generation(&self) -> Duration {
        Duration::from_millis(self.generation_ms)
    }

    pub fn cache(&self) -> Duration {
        Duration::from_millis(self.cache_ms)
    }
}

/// Answers questions: embed, consult the cache, retrieve, generate, store
#[derive(Debug)]
pub struct QueryOrchestrator {
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: HybridRetriever,
    generator: Arc<dyn GenerationProvider>,
    cache: Arc<SemanticCacheService>,
    defaults: QueryDefaults,
    timeouts: StageTimeouts,
}

impl QueryOrchestrator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        retriever: HybridRetriever,
        generator: Arc<dyn GenerationProvider>,
        cache: Arc<SemanticCacheService>,
    ) -> Self {
        Self {
            embedder,
            retriever,
            generator,
            cache,
            defaults: QueryDefaults::default(),
            timeouts: StageTimeouts::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn cache(&self) -> &Arc<SemanticCacheService> {
        &self.cache
    }

    /// Answer a question
    #[instrument(skip(self, request), fields(request_id = %Uuid::new_v4()))]
    pub async fn answer_question(&self, request: QueryRequest) -> Result<QueryResult, QueryError> {
        let start = Instant::now();
        let requested = request.strategy.unwrap_or(self.defaults.default_strategy);

        info!(question = %request.question, strategy = %requested, "Answering question");

        let result = self.run(request).await;

        match &result {
            Ok(answered) => {
                info!(
                    strategy = %answered.strategy,
                    cached = answered.cached,
                    evidence = answered.evidence.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Question answered"
                );
                record_query(
                    answered.strategy.as_str(),
                    "success",
                    answered.cached,
                    start.elapsed(),
                );
            }
            Err(e) => {
                warn!(stage = %e.stage(), error = %e, "Question failed");
                record_query(requested.as_str(), e.stage().as_str(), false, start.elapsed());
            }
        }

        result
    }

    async fn run(&self, request: QueryRequest) -> Result<QueryResult, QueryError> {
        let mut machine = QueryMachine::new(request, &self.defaults)?;
        let mut fill: Option<FillPermit> = None;

        loop {
            let outcome = match machine.next_action() {
                QueryAction::Finish => break,
                QueryAction::Embed { question } => self.embed(question).await,
                QueryAction::LookupCache { embedding } => {
                    let (outcome, permit) = self.lookup(embedding).await;
                    fill = permit;
                    outcome
                }
                QueryAction::Retrieve {
                    embedding,
                    question,
                    top_k,
                    strategy,
                } => match self
                    .retriever
                    .retrieve(embedding, question, top_k, strategy)
                    .await
                {
                    Ok(retrieval) => StepOutcome::Retrieved(retrieval),
                    Err(e) => StepOutcome::Failed(e),
                },
                QueryAction::Generate { question, evidence } => {
                    self.generate(question, evidence).await
                }
                QueryAction::Store { embedding, answer } => {
                    self.store(fill.take(), embedding, answer).await;
                    StepOutcome::Stored
                }
            };

            debug!(state = ?machine.state(), "Applying step outcome");
            machine = machine.apply(outcome)?;
        }

        machine.into_result()
    }

    async fn embed(&self, question: &str) -> StepOutcome {
        let start = Instant::now();
        let timeout = self.timeouts.embedding();

        let outcome = match tokio::time::timeout(timeout, self.embedder.embed(question)).await {
            Ok(Ok(embedding)) => StepOutcome::Embedded(embedding),
            Ok(Err(e)) => StepOutcome::Failed(QueryError::embedding_failed(e)),
            Err(_) => StepOutcome::Failed(QueryError::timeout(
                QueryStage::Embedding,
                timeout.as_millis() as u64,
            )),
        };

        record_stage(QueryStage::Embedding.as_str(), start.elapsed());
        outcome
    }

    /// Consult the cache; lookup problems degrade to a miss
    async fn lookup(&self, embedding: &Embedding) -> (StepOutcome, Option<FillPermit>) {
        if !self.cache.is_enabled() {
            return (StepOutcome::CacheMiss, None);
        }

        let start = Instant::now();
        let timeout = self.timeouts.cache();

        let result = loop {
            match tokio::time::timeout(timeout, self.cache.lookup_or_claim(embedding)).await {
                Ok(Ok(CacheLookup::Hit(hit))) => break (hit_outcome(hit), None),
                Ok(Ok(CacheLookup::Miss(permit))) => break (StepOutcome::CacheMiss, Some(permit)),
                Ok(Ok(CacheLookup::Wait(waiter))) => {
                    debug!(
                        similarity = waiter.similarity(),
                        "Waiting for concurrent query"
                    );
                    if let Some(hit) = self.cache.await_fill(waiter).await {
                        break (hit_outcome(hit), None);
                    }
                    debug!("Concurrent query gave up, looking up again");
                }
                Ok(Err(e)) if e.is_invalid_embedding() => {
                    warn!(error = %e, "Embedding rejected by cache, treating as miss");
                    break (StepOutcome::CacheMiss, None);
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Cache lookup failed, treating as miss");
                    break (StepOutcome::CacheMiss, None);
                }
                Err(_) => {
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "Cache lookup timed out, treating as miss"
                    );
                    break (StepOutcome::CacheMiss, None);
                }
            }
        };

        record_stage(QueryStage::CacheLookup.as_str(), start.elapsed());
        result
    }

    async fn generate(&self, question: &str, evidence: &[Evidence]) -> StepOutcome {
        let start = Instant::now();
        let timeout = self.timeouts.generation();

        let outcome =
            match tokio::time::timeout(timeout, self.generator.generate(question, evidence)).await
            {
                Ok(Ok(answer)) => StepOutcome::Generated(answer),
                Ok(Err(e)) => StepOutcome::Failed(QueryError::generation_failed(e)),
                Err(_) => StepOutcome::Failed(QueryError::timeout(
                    QueryStage::Generation,
                    timeout.as_millis() as u64,
                )),
            };

        record_stage(QueryStage::Generation.as_str(), start.elapsed());
        outcome
    }

    /// Best-effort write-back; failures are only logged
    async fn store(&self, permit: Option<FillPermit>, embedding: &Embedding, answer: CachedAnswer) {
        if !self.cache.is_enabled() {
            return;
        }

        let start = Instant::now();
        let timeout = self.timeouts.cache();

        let result = match permit {
            Some(permit) => {
                self.cache
                    .complete_fill(permit, embedding, answer, timeout)
                    .await
            }
            None => self.cache.store_within(embedding, answer, timeout).await,
        };

        match result {
            Ok(entry) => debug!(entry_id = %entry.id, "Answer cached"),
            Err(e) => warn!(error = %e, "Failed to cache answer"),
        }

        record_stage(QueryStage::CacheStore.as_str(), start.elapsed());
    }

    /// Vector search for chunks similar to a text, without generation
    pub async fn find_similar(&self, text: &str, top_k: usize) -> Result<Vec<Evidence>, QueryError> {
        if text.trim().is_empty() {
            return Err(QueryError::invalid_request("text must not be empty"));
        }

        let embedding = match self.embed(text).await {
            StepOutcome::Embedded(embedding) => embedding,
            StepOutcome::Failed(e) => return Err(e),
            _ => {
                return Err(QueryError::internal(
                    QueryStage::Embedding,
                    "unexpected embedding outcome",
                ));
            }
        };

        self.retriever.similar(&embedding, top_k.max(1)).await
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Empty the cache, optionally resetting the counters
    pub async fn clear_cache(&self, reset_stats: bool) -> Result<(), DomainError> {
        self.cache.clear(reset_stats).await
    }

    /// Probe the cache backend
    pub async fn cache_health(&self) -> CacheHealth {
        self.cache.health().await
    }
}

fn hit_outcome(hit: CacheHit) -> StepOutcome {
    StepOutcome::CacheHit {
        answer: hit.answer,
        similarity: hit.similarity,
        shared: hit.shared,
    }
}
