//! Pipeline configuration models for `.gatekeeper/pipelines/*.yaml`.
//!
//! This module defines the structure of pipeline definition files that
//! describe the ordered stages of a release pipeline.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Placeholder replaced by the task parameter in instructions and arguments.
pub const PARAM_PLACEHOLDER: &str = "{param}";

/// A single stage of a pipeline definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct StageDefinition {
    /// Stage name. Must be unique within the pipeline and match a
    /// registered executor.
    pub name: String,

    /// Instruction sent to the stage's agent. `{param}` is replaced by the
    /// task parameter.
    #[serde(default)]
    pub instruction: String,

    /// External command backing the stage, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments for `command`. `{param}` and `{instruction}` are expanded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl StageDefinition {
    /// A stage with a name and instruction template.
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
            command: None,
            args: Vec::new(),
        }
    }

    /// Render the instruction for a task parameter.
    pub fn render_instruction(&self, param: &str) -> String {
        self.instruction.replace(PARAM_PLACEHOLDER, param)
    }
}

/// Defines a full pipeline: a name and its stages in execution order.
///
/// # Example
///
/// ```yaml
/// name: release
/// stages:
///   - name: Initialize
///   - name: Tagging and Change log
///     instruction: "create tag v{param} and generate release notes"
///     command: "release-agent"
///     args: ["tag", "{param}"]
///   - name: Trust
///     instruction: "scan tag v{param} for vulnerabilities and license risk"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineDefinition {
    /// Unique name identifying this pipeline.
    pub name: String,

    /// Stages in execution order.
    pub stages: Vec<StageDefinition>,
}

impl PipelineDefinition {
    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|stage| stage.name.clone()).collect()
    }
}
