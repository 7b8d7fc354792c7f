//! Error types for the stage pipeline.

use thiserror::Error;

/// Errors surfaced by [`StagePipeline`](super::StagePipeline).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Bad or missing input. Nothing was mutated.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A stage failed with a non-transient or retry-exhausted error.
    #[error("{stage} failed: {reason}")]
    StageExecution { stage: String, reason: String },

    /// A stage has no registered executor. This is a construction bug.
    #[error("No executor registered for stage '{0}'")]
    UnknownStage(String),

    /// The pipeline reached a state its construction should have ruled out.
    #[error("Internal pipeline error: {0}")]
    Internal(String),
}

/// Type alias for Result with PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;
