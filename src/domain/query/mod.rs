//! Query domain - requests, results, errors and the orchestration state machine

mod error;
mod request;
mod state;

pub use error::{QueryError, QueryStage};
pub use request::{QueryDefaults, QueryRequest, QueryResult};
pub use state::{QueryAction, QueryMachine, QueryStateKind, StepOutcome};
