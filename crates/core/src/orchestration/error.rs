use std::time::Duration;
use thiserror::Error;

use crate::agents::base::AgentError;

/// Errors that end an orchestration run.
///
/// None of these are retried by the coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("Orchestration exhausted: no final answer after {max_invocations} worker invocations")]
    Exhausted { max_invocations: usize },

    #[error("Orchestration timed out after {0:?} waiting for the final result")]
    Timeout(Duration),

    #[error("Manager '{manager}' failed: {source}")]
    Manager {
        manager: String,
        #[source]
        source: AgentError,
    },

    #[error("Worker '{worker}' failed: {source}")]
    Worker {
        worker: String,
        #[source]
        source: AgentError,
    },

    #[error("Manager chose unknown worker '{0}'")]
    UnknownWorker(String),

    #[error("No workers registered")]
    NoWorkers,

    #[error("Orchestration canceled")]
    Canceled,
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
