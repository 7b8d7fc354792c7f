//! Test fixtures for creating sample configurations and pipelines.

use gk_core::agents::{AgentExecutor, StageRegistry};
use gk_protocol::pipeline_models::{PipelineDefinition, StageDefinition};
use std::sync::Arc;
use tempfile::TempDir;

/// Stage names of the four-stage scenario pipeline.
#[allow(dead_code)]
pub const SCENARIO_STAGES: [&str; 4] = ["Init", "Tag", "Trust", "Review"];

/// A pipeline definition with one instruction per stage.
#[allow(dead_code)]
pub fn pipeline_definition(names: &[&str]) -> PipelineDefinition {
    PipelineDefinition {
        name: "test-pipeline".to_string(),
        stages: names
            .iter()
            .map(|name| StageDefinition::new(*name, format!("{name} v{{param}}")))
            .collect(),
    }
}

/// Registry binding each stage name to the executor at the same position.
#[allow(dead_code)]
pub fn registry_of(bindings: Vec<(&str, Arc<dyn AgentExecutor>)>) -> StageRegistry {
    let mut registry = StageRegistry::new();
    for (name, executor) in bindings {
        registry.register(name, executor);
    }
    registry
}

/// Create a temporary project directory with `.gatekeeper` configuration.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let gk_dir = temp_dir.path().join(".gatekeeper");
    std::fs::create_dir_all(gk_dir.join("pipelines"))?;

    let config_toml = r#"
[pipeline]
auto_chain = false

[orchestration]
max_invocations = 3
result_timeout_secs = 60
"#;
    std::fs::write(gk_dir.join("config.toml"), config_toml)?;

    let pipeline_yaml = r#"
name: hotfix
stages:
  - name: Tag
    instruction: "create tag v{param} and generate release notes"
  - name: Review
    instruction: "Do a code review for the tag v{param}"
"#;
    std::fs::write(gk_dir.join("pipelines/hotfix.yaml"), pipeline_yaml)?;

    Ok(temp_dir)
}
