//! Stage executors wired from pipeline definitions.

use async_trait::async_trait;
use gk_core::agents::{AgentError, AgentExecutor, CommandExecutor, ExecutionContext, StageRegistry};
use gk_core::cancel::CancellationToken;
use gk_protocol::pipeline_models::PipelineDefinition;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Stand-in for stages without a command: reports the instruction it would
/// have sent.
pub struct DryRunExecutor;

#[async_trait]
impl AgentExecutor for DryRunExecutor {
    async fn invoke(
        &self,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Canceled);
        }
        if context.instruction.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("(dry run) {}", context.instruction))
    }
}

/// Bind every stage to a command executor running in `root`, or to the dry
/// run executor when the stage names no command.
pub fn build_registry(pipeline: &PipelineDefinition, root: &Path) -> StageRegistry {
    let mut registry = StageRegistry::new();
    for stage in &pipeline.stages {
        let executor: Arc<dyn AgentExecutor> = match CommandExecutor::from_definition(stage) {
            Some(command) => {
                debug!(stage = %stage.name, program = command.program(), "command-backed stage");
                Arc::new(command.with_working_dir(root))
            }
            None => Arc::new(DryRunExecutor),
        };
        registry.register(stage.name.as_str(), executor);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_protocol::pipeline_models::StageDefinition;

    #[test]
    fn test_every_stage_is_bound() {
        let mut tag = StageDefinition::new("Tag", "create tag v{param}");
        tag.command = Some("git".to_string());
        let pipeline = PipelineDefinition {
            name: "release".to_string(),
            stages: vec![StageDefinition::new("Initialize", ""), tag],
        };

        let registry = build_registry(&pipeline, Path::new("."));

        assert_eq!(registry.list_stages(), vec!["Initialize", "Tag"]);
    }

    #[tokio::test]
    async fn test_dry_run_reports_instruction() {
        let context = ExecutionContext::for_stage("Trust", "1.2.3").with_instruction("scan v1.2.3");
        let output = DryRunExecutor
            .invoke(&context, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output, "(dry run) scan v1.2.3");
    }
}
