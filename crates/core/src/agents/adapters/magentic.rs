//! Stage executor that runs a multi-agent orchestration.

use crate::agents::base::{AgentError, AgentExecutor, ExecutionContext};
use crate::cancel::CancellationToken;
use crate::orchestration::{MagenticCoordinator, OrchestrationError};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs a [`MagenticCoordinator`] for a stage and returns its final answer.
///
/// The task is the stage's rendered instruction, or the task parameter when
/// the stage has no instruction.
pub struct MagenticExecutor {
    coordinator: Arc<MagenticCoordinator>,
}

impl MagenticExecutor {
    pub fn new(coordinator: Arc<MagenticCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl AgentExecutor for MagenticExecutor {
    async fn invoke(
        &self,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        let task = if context.instruction.trim().is_empty() {
            context.task_parameter.as_str()
        } else {
            context.instruction.as_str()
        };

        match self.coordinator.run(task, cancel).await {
            Ok(outcome) => Ok(outcome.answer),
            Err(OrchestrationError::Canceled) => Err(AgentError::Canceled),
            Err(err) => Err(AgentError::Orchestration(err.to_string())),
        }
    }
}
