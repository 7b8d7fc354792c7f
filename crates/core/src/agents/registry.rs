//! Stage registry mapping stage names to executors.
//!
//! The `StageRegistry` is responsible for:
//! - Registering one executor per stage name
//! - Resolving a pipeline's stage list into executors before it runs, so an
//!   unregistered stage fails at construction instead of mid-pipeline

use crate::agents::base::AgentExecutor;
use crate::pipeline::error::{PipelineError, PipelineResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of stage executors, keyed by stage name.
#[derive(Default, Clone)]
pub struct StageRegistry {
    executors: HashMap<String, Arc<dyn AgentExecutor>>,
}

impl StageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the executor for a stage.
    pub fn register(&mut self, stage_name: impl Into<String>, executor: Arc<dyn AgentExecutor>) {
        self.executors.insert(stage_name.into(), executor);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_executor(
        mut self,
        stage_name: impl Into<String>,
        executor: Arc<dyn AgentExecutor>,
    ) -> Self {
        self.register(stage_name, executor);
        self
    }

    /// Get the executor for a stage.
    pub fn get(&self, stage_name: &str) -> Option<Arc<dyn AgentExecutor>> {
        self.executors.get(stage_name).cloned()
    }

    /// Resolve the executor for a stage, failing on an unregistered name.
    pub fn resolve(&self, stage_name: &str) -> PipelineResult<Arc<dyn AgentExecutor>> {
        self.get(stage_name)
            .ok_or_else(|| PipelineError::UnknownStage(stage_name.to_string()))
    }

    /// List all registered stage names, sorted.
    pub fn list_stages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.executors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a stage has an executor.
    pub fn has_stage(&self, stage_name: &str) -> bool {
        self.executors.contains_key(stage_name)
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}
