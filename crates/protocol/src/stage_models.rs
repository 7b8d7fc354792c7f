//! Runtime stage state models.
//!
//! This module defines the structures for tracking the state of a running
//! release pipeline and the read-only snapshot handed to observers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle status of a single pipeline stage.
///
/// Normal progression is `Pending -> InProgress -> Completed`. A stage that
/// fails stays `Failed` until it is started again or the pipeline is reset.
/// A canceled stage goes back to `Pending`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// Stage has not run yet, or was canceled.
    #[default]
    Pending,

    /// Stage is executing its agent.
    InProgress,

    /// Stage finished successfully.
    Completed,

    /// Stage execution failed.
    Failed,
}

impl StageStatus {
    /// Whether the status is the outcome of a finished attempt.
    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Completed | StageStatus::Failed)
    }
}

/// One named unit of pipeline work.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Stage {
    /// Display name, also the key used to look up the stage's executor.
    pub name: String,

    /// Current status.
    pub status: StageStatus,
}

impl Stage {
    /// Create a pending stage.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Pending,
        }
    }
}

/// Read-only view of a pipeline run, suitable for rendering progress.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PipelineSnapshot {
    /// Identifier of the run this snapshot was taken from.
    #[ts(type = "string")]
    pub run_id: Uuid,

    /// Stages in execution order.
    pub stages: Vec<Stage>,

    /// Zero-based index of the stage currently running or next to run.
    pub current_index: usize,

    /// Task parameter the run was started with (e.g. a tag name).
    pub task_parameter: Option<String>,

    /// The current stage is in progress.
    pub busy: bool,

    /// Every stage has completed.
    pub all_done: bool,

    /// Number of completed stages.
    pub completed_count: usize,

    /// `completed_count / stages.len() * 100`.
    pub progress_percent: f64,

    /// A manual start is currently permitted.
    pub can_start: bool,
}
