pub mod run;
pub mod stages;

use anyhow::{anyhow, Context};
use gk_core::config::{load_config, AppConfig};
use gk_protocol::pipeline_models::PipelineDefinition;
use std::path::Path;

/// Load configuration under `root` and resolve the named pipeline.
pub async fn load_pipeline(
    root: &Path,
    name: &str,
) -> anyhow::Result<(AppConfig, PipelineDefinition)> {
    let config = load_config(root)
        .await
        .with_context(|| format!("Failed to load configuration from {}", root.display()))?;

    let pipeline = config.resolve_pipeline(name).ok_or_else(|| {
        let known: Vec<&str> = config.pipelines.iter().map(|p| p.name.as_str()).collect();
        anyhow!("Unknown pipeline '{name}' (available: {})", known.join(", "))
    })?;

    Ok((config, pipeline))
}
