//! Configuration models that aggregate all settings.
//!
//! This module provides the unified `AppConfig` structure that combines
//! global settings and pipeline definitions into a single configuration
//! object.

use gk_protocol::config_models::Settings;
use gk_protocol::pipeline_models::{PipelineDefinition, StageDefinition};

/// Name of the built-in release pipeline.
pub const DEFAULT_PIPELINE_NAME: &str = "release";

/// Unified application configuration loaded from the `.gatekeeper/` directory.
///
/// # Example
///
/// ```rust,no_run
/// use gk_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} pipelines", config.pipelines.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Settings from `config.toml`.
    pub settings: Settings,

    /// Pipeline definitions from `pipelines/*.yaml`, sorted by file name.
    pub pipelines: Vec<PipelineDefinition>,
}

impl AppConfig {
    /// Look up a pipeline by name.
    pub fn find_pipeline(&self, name: &str) -> Option<&PipelineDefinition> {
        self.pipelines.iter().find(|pipeline| pipeline.name == name)
    }

    /// The named pipeline, falling back to the built-in release pipeline when
    /// `name` is the default name and no file overrides it.
    pub fn resolve_pipeline(&self, name: &str) -> Option<PipelineDefinition> {
        match self.find_pipeline(name) {
            Some(pipeline) => Some(pipeline.clone()),
            None if name == DEFAULT_PIPELINE_NAME => Some(default_release_pipeline()),
            None => None,
        }
    }
}

/// The four-stage release pipeline used when no definition file exists.
pub fn default_release_pipeline() -> PipelineDefinition {
    PipelineDefinition {
        name: DEFAULT_PIPELINE_NAME.to_string(),
        stages: vec![
            StageDefinition::new("Initialize", "prepare the release of v{param}"),
            StageDefinition::new(
                "Tagging and Change log",
                "create tag v{param} and generate release notes",
            ),
            StageDefinition::new(
                "Trust",
                "scan tag v{param} for vulnerabilities and license risk",
            ),
            StageDefinition::new("Smart code review", "Do a code review for the tag v{param}"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_release_pipeline() {
        let pipeline = default_release_pipeline();
        assert_eq!(
            pipeline.stage_names(),
            vec!["Initialize", "Tagging and Change log", "Trust", "Smart code review"]
        );
        assert_eq!(
            pipeline.stages[3].render_instruction("1.2.3"),
            "Do a code review for the tag v1.2.3"
        );
    }

    #[test]
    fn test_resolve_pipeline() {
        let mut config = AppConfig::default();
        assert!(config.resolve_pipeline(DEFAULT_PIPELINE_NAME).is_some());
        assert!(config.resolve_pipeline("hotfix").is_none());

        config.pipelines.push(PipelineDefinition {
            name: DEFAULT_PIPELINE_NAME.to_string(),
            stages: vec![StageDefinition::new("Only", "")],
        });
        let resolved = config.resolve_pipeline(DEFAULT_PIPELINE_NAME).unwrap();
        assert_eq!(resolved.stage_names(), vec!["Only"]);
    }
}
