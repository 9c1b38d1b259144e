//! Query orchestration state machine
//!
//! Transitions are pure. The machine names the next external step
//! ([`QueryAction`]); a driver performs it and feeds back a [`StepOutcome`].
//!
//! ```text
//! Received -> Embedded -> CacheHit
//!                      -> CacheMiss -> Retrieving -> [RetrievalFailed] -> Retrieved
//!                                   -> Generated -> Completed
//! ```

use std::sync::Arc;

use super::{QueryDefaults, QueryError, QueryRequest, QueryResult, QueryStage};
use crate::domain::embedding::Embedding;
use crate::domain::retrieval::{Evidence, Retrieval, SearchStrategy};
use crate::domain::semantic_cache::CachedAnswer;

/// Every state a query can pass through
///
/// `CacheMiss` and `RetrievalFailed` are passed through within a single
/// transition and only show up in [`QueryMachine::visited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStateKind {
    Received,
    Embedded,
    CacheHit,
    CacheMiss,
    Retrieving,
    RetrievalFailed,
    Retrieved,
    Generated,
    Completed,
}

#[derive(Debug, Clone)]
enum QueryState {
    Received,
    Embedded {
        embedding: Embedding,
    },
    CacheHit {
        answer: Arc<CachedAnswer>,
        similarity: f32,
    },
    Retrieving {
        embedding: Embedding,
    },
    Retrieved {
        embedding: Embedding,
        evidence: Vec<Evidence>,
    },
    Generated {
        embedding: Embedding,
        evidence: Vec<Evidence>,
        answer: String,
    },
    Completed {
        evidence: Vec<Evidence>,
        answer: String,
    },
}

impl QueryState {
    fn kind(&self) -> QueryStateKind {
        match self {
            Self::Received => QueryStateKind::Received,
            Self::Embedded { .. } => QueryStateKind::Embedded,
            Self::CacheHit { .. } => QueryStateKind::CacheHit,
            Self::Retrieving { .. } => QueryStateKind::Retrieving,
            Self::Retrieved { .. } => QueryStateKind::Retrieved,
            Self::Generated { .. } => QueryStateKind::Generated,
            Self::Completed { .. } => QueryStateKind::Completed,
        }
    }

    /// Stage of the step awaited in this state
    fn pending_stage(&self) -> QueryStage {
        match self {
            Self::Received => QueryStage::Embedding,
            Self::Embedded { .. } => QueryStage::CacheLookup,
            Self::Retrieving { .. } => QueryStage::Retrieval,
            Self::Retrieved { .. } => QueryStage::Generation,
            Self::Generated { .. } | Self::CacheHit { .. } | Self::Completed { .. } => {
                QueryStage::CacheStore
            }
        }
    }
}

/// The external step the driver must run next
#[derive(Debug)]
pub enum QueryAction<'a> {
    Embed {
        question: &'a str,
    },
    LookupCache {
        embedding: &'a Embedding,
    },
    Retrieve {
        embedding: &'a Embedding,
        question: &'a str,
        top_k: usize,
        strategy: SearchStrategy,
    },
    Generate {
        question: &'a str,
        evidence: &'a [Evidence],
    },
    Store {
        embedding: &'a Embedding,
        answer: CachedAnswer,
    },
    Finish,
}

/// What happened when the driver ran a step
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Embedded(Embedding),
    CacheHit {
        answer: Arc<CachedAnswer>,
        similarity: f32,
        /// The answer came from a concurrent fill rather than the index
        shared: bool,
    },
    CacheMiss,
    Retrieved(Retrieval),
    Generated(String),
    Stored,
    Failed(QueryError),
}

impl StepOutcome {
    fn name(&self) -> &'static str {
        match self {
            Self::Embedded(_) => "embedded",
            Self::CacheHit { .. } => "cache hit",
            Self::CacheMiss => "cache miss",
            Self::Retrieved(_) => "retrieved",
            Self::Generated(_) => "generated",
            Self::Stored => "stored",
            Self::Failed(_) => "failed",
        }
    }
}

/// A single question moving through the pipeline
#[derive(Debug, Clone)]
pub struct QueryMachine {
    question: String,
    top_k: usize,
    strategy: SearchStrategy,
    state: QueryState,
    steps: Vec<String>,
    visited: Vec<QueryStateKind>,
}

impl QueryMachine {
    /// Validate a request and resolve its options against the defaults
    pub fn new(request: QueryRequest, defaults: &QueryDefaults) -> Result<Self, QueryError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(QueryError::invalid_request("question must not be empty"));
        }

        let top_k = match request.top_k {
            Some(0) => return Err(QueryError::invalid_request("top_k must be at least 1")),
            Some(top_k) => top_k.min(defaults.max_top_k.max(1)),
            None => defaults.default_top_k.max(1),
        };

        Ok(Self {
            question: question.to_string(),
            top_k,
            strategy: request.strategy.unwrap_or(defaults.default_strategy),
            state: QueryState::Received,
            steps: Vec::new(),
            visited: vec![QueryStateKind::Received],
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    pub fn state(&self) -> QueryStateKind {
        self.state.kind()
    }

    /// States passed through so far, in order
    pub fn visited(&self) -> &[QueryStateKind] {
        &self.visited
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.next_action(), QueryAction::Finish)
    }

    pub fn next_action(&self) -> QueryAction<'_> {
        match &self.state {
            QueryState::Received => QueryAction::Embed {
                question: &self.question,
            },
            QueryState::Embedded { embedding } => QueryAction::LookupCache { embedding },
            QueryState::Retrieving { embedding } => QueryAction::Retrieve {
                embedding,
                question: &self.question,
                top_k: self.top_k,
                strategy: self.strategy,
            },
            QueryState::Retrieved { evidence, .. } => QueryAction::Generate {
                question: &self.question,
                evidence,
            },
            QueryState::Generated {
                embedding,
                evidence,
                answer,
            } => QueryAction::Store {
                embedding,
                answer: CachedAnswer::new(
                    self.question.clone(),
                    answer.clone(),
                    evidence.clone(),
                    self.strategy,
                ),
            },
            QueryState::CacheHit { .. } | QueryState::Completed { .. } => QueryAction::Finish,
        }
    }

    /// Advance with the outcome of the current action
    ///
    /// A `Failed` outcome, or an outcome that does not fit the current
    /// state, ends the query with an error.
    pub fn apply(mut self, outcome: StepOutcome) -> Result<Self, QueryError> {
        let state = std::mem::replace(&mut self.state, QueryState::Received);

        match (state, outcome) {
            (_, StepOutcome::Failed(error)) => return Err(error),

            (QueryState::Received, StepOutcome::Embedded(embedding)) => {
                self.enter(QueryState::Embedded { embedding });
            }

            (
                QueryState::Embedded { .. },
                StepOutcome::CacheHit {
                    answer,
                    similarity,
                    shared,
                },
            ) => {
                let step = if shared {
                    "Retrieved from concurrent query"
                } else {
                    "Retrieved from cache"
                };
                self.steps.push(step.to_string());
                self.enter(QueryState::CacheHit { answer, similarity });
            }

            (QueryState::Embedded { embedding }, StepOutcome::CacheMiss) => {
                self.visited.push(QueryStateKind::CacheMiss);
                self.steps.push(format!("Route: {} search", self.strategy));
                self.enter(QueryState::Retrieving { embedding });
            }

            (QueryState::Retrieving { embedding }, StepOutcome::Retrieved(retrieval)) => {
                if retrieval.is_degraded() {
                    self.visited.push(QueryStateKind::RetrievalFailed);
                }
                let Retrieval { evidence, notices } = retrieval;
                self.steps.extend(notices);
                self.steps.push(format!("Found {} results", evidence.len()));
                self.enter(QueryState::Retrieved {
                    embedding,
                    evidence,
                });
            }

            (
                QueryState::Retrieved {
                    embedding,
                    evidence,
                },
                StepOutcome::Generated(answer),
            ) => {
                self.steps.push("Generated answer".to_string());
                self.enter(QueryState::Generated {
                    embedding,
                    evidence,
                    answer,
                });
            }

            (QueryState::Generated { evidence, answer, .. }, StepOutcome::Stored) => {
                self.enter(QueryState::Completed { evidence, answer });
            }

            (state, outcome) => {
                return Err(QueryError::internal(
                    state.pending_stage(),
                    format!(
                        "unexpected outcome '{}' in state {:?}",
                        outcome.name(),
                        state.kind()
                    ),
                ));
            }
        }

        Ok(self)
    }

    /// Build the result of a finished query
    pub fn into_result(self) -> Result<QueryResult, QueryError> {
        match self.state {
            QueryState::CacheHit { answer, similarity } => Ok(QueryResult {
                question: self.question,
                answer: answer.answer.clone(),
                evidence: answer.evidence.clone(),
                strategy: answer.strategy,
                steps: self.steps,
                cached: true,
                similarity: Some(similarity),
                original_query: Some(answer.question.clone()),
            }),
            QueryState::Completed { evidence, answer } => Ok(QueryResult {
                question: self.question,
                answer,
                evidence,
                strategy: self.strategy,
                steps: self.steps,
                cached: false,
                similarity: None,
                original_query: None,
            }),
            state => Err(QueryError::internal(
                state.pending_stage(),
                format!("query not finished, still in state {:?}", state.kind()),
            )),
        }
    }

    fn enter(&mut self, state: QueryState) {
        self.visited.push(state.kind());
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(request: QueryRequest) -> QueryMachine {
        QueryMachine::new(request, &QueryDefaults::default()).unwrap()
    }

    fn embedding() -> Embedding {
        Embedding::new(vec![1.0, 0.0, 0.0]).unwrap()
    }

    fn cached_answer() -> Arc<CachedAnswer> {
        Arc::new(CachedAnswer::new(
            "Who founded Acme?",
            "Alice",
            vec![Evidence::vector("c1", "Alice founded Acme", 0.9)],
            SearchStrategy::Vector,
        ))
    }

    #[test]
    fn test_new_applies_defaults() {
        let machine = machine(QueryRequest::new("  What is Acme?  "));

        assert_eq!(machine.question(), "What is Acme?");
        assert_eq!(machine.top_k(), 3);
        assert_eq!(machine.strategy(), SearchStrategy::Hybrid);
        assert_eq!(machine.state(), QueryStateKind::Received);
    }

    #[test]
    fn test_new_clamps_top_k() {
        let machine = machine(QueryRequest::new("q").with_top_k(50));
        assert_eq!(machine.top_k(), 10);
    }

    #[test]
    fn test_new_rejects_bad_requests() {
        let defaults = QueryDefaults::default();

        let err = QueryMachine::new(QueryRequest::new("   "), &defaults).unwrap_err();
        assert_eq!(err.stage(), QueryStage::Request);

        let err = QueryMachine::new(QueryRequest::new("q").with_top_k(0), &defaults).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRequest { .. }));
    }

    #[test]
    fn test_cache_hit_path() {
        let machine = machine(QueryRequest::new("Who started Acme?"));
        assert!(matches!(machine.next_action(), QueryAction::Embed { .. }));

        let machine = machine.apply(StepOutcome::Embedded(embedding())).unwrap();
        assert!(matches!(machine.next_action(), QueryAction::LookupCache { .. }));

        let machine = machine
            .apply(StepOutcome::CacheHit {
                answer: cached_answer(),
                similarity: 0.97,
                shared: false,
            })
            .unwrap();
        assert!(machine.is_finished());

        assert_eq!(
            machine.visited(),
            &[
                QueryStateKind::Received,
                QueryStateKind::Embedded,
                QueryStateKind::CacheHit
            ]
        );

        let result = machine.into_result().unwrap();
        assert!(result.cached);
        assert_eq!(result.question, "Who started Acme?");
        assert_eq!(result.original_query.as_deref(), Some("Who founded Acme?"));
        assert_eq!(result.similarity, Some(0.97));
        assert_eq!(result.strategy, SearchStrategy::Vector);
        assert_eq!(result.steps, vec!["Retrieved from cache"]);
    }

    #[test]
    fn test_shared_hit_step() {
        let machine = machine(QueryRequest::new("q"))
            .apply(StepOutcome::Embedded(embedding()))
            .unwrap()
            .apply(StepOutcome::CacheHit {
                answer: cached_answer(),
                similarity: 1.0,
                shared: true,
            })
            .unwrap();

        assert_eq!(machine.steps(), &["Retrieved from concurrent query"]);
    }

    #[test]
    fn test_miss_path() {
        let machine = machine(QueryRequest::new("q").with_strategy(SearchStrategy::Graph))
            .apply(StepOutcome::Embedded(embedding()))
            .unwrap()
            .apply(StepOutcome::CacheMiss)
            .unwrap();

        match machine.next_action() {
            QueryAction::Retrieve {
                top_k, strategy, ..
            } => {
                assert_eq!(top_k, 3);
                assert_eq!(strategy, SearchStrategy::Graph);
            }
            other => panic!("unexpected action {:?}", other),
        }

        let machine = machine
            .apply(StepOutcome::Retrieved(Retrieval::new(vec![
                Evidence::graph("c1", "text", 0.5),
            ])))
            .unwrap();
        assert!(matches!(
            machine.next_action(),
            QueryAction::Generate { evidence, .. } if evidence.len() == 1
        ));

        let machine = machine
            .apply(StepOutcome::Generated("answer".to_string()))
            .unwrap();
        match machine.next_action() {
            QueryAction::Store { answer, .. } => {
                assert_eq!(answer.question, "q");
                assert_eq!(answer.answer, "answer");
                assert_eq!(answer.strategy, SearchStrategy::Graph);
            }
            other => panic!("unexpected action {:?}", other),
        }

        let machine = machine.apply(StepOutcome::Stored).unwrap();
        assert!(machine.is_finished());
        assert_eq!(
            machine.visited(),
            &[
                QueryStateKind::Received,
                QueryStateKind::Embedded,
                QueryStateKind::CacheMiss,
                QueryStateKind::Retrieving,
                QueryStateKind::Retrieved,
                QueryStateKind::Generated,
                QueryStateKind::Completed,
            ]
        );

        let result = machine.into_result().unwrap();
        assert!(!result.cached);
        assert!(result.similarity.is_none());
        assert!(result.original_query.is_none());
        assert_eq!(
            result.steps,
            vec!["Route: graph search", "Found 1 results", "Generated answer"]
        );
    }

    #[test]
    fn test_degraded_retrieval_trace() {
        let retrieval = Retrieval::new(vec![Evidence::vector("c1", "text", 0.9)])
            .with_notice("Graph search unavailable, used vector only");

        let machine = machine(QueryRequest::new("q"))
            .apply(StepOutcome::Embedded(embedding()))
            .unwrap()
            .apply(StepOutcome::CacheMiss)
            .unwrap()
            .apply(StepOutcome::Retrieved(retrieval))
            .unwrap();

        assert!(machine.visited().contains(&QueryStateKind::RetrievalFailed));
        assert_eq!(
            machine.steps(),
            &[
                "Route: hybrid search",
                "Graph search unavailable, used vector only",
                "Found 1 results"
            ]
        );
    }

    #[test]
    fn test_failure_ends_query() {
        let machine = machine(QueryRequest::new("q"))
            .apply(StepOutcome::Embedded(embedding()))
            .unwrap()
            .apply(StepOutcome::CacheMiss)
            .unwrap()
            .apply(StepOutcome::Retrieved(Retrieval::default()))
            .unwrap();

        let err = machine
            .apply(StepOutcome::Failed(QueryError::generation_failed("model offline")))
            .unwrap_err();

        assert_eq!(err.stage(), QueryStage::Generation);
    }

    #[test]
    fn test_unexpected_outcome_is_internal_error() {
        let err = machine(QueryRequest::new("q"))
            .apply(StepOutcome::Stored)
            .unwrap_err();

        assert!(matches!(
            err,
            QueryError::Internal {
                stage: QueryStage::Embedding,
                ..
            }
        ));
    }

    #[test]
    fn test_unfinished_result_is_error() {
        let machine = machine(QueryRequest::new("q"))
            .apply(StepOutcome::Embedded(embedding()))
            .unwrap();

        assert!(machine.into_result().is_err());
    }
}
