//! Configuration file loader for the `.gatekeeper/` directory structure.
//!
//! This module loads:
//! - `config.toml`: Retry, rate limit, orchestration and pipeline settings
//! - `pipelines/*.yaml`: Pipeline definitions

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use gk_protocol::config_models::Settings;
use gk_protocol::pipeline_models::PipelineDefinition;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Name of the configuration directory under the project root.
pub const CONFIG_DIR: &str = ".gatekeeper";

/// Loads all configuration from the `.gatekeeper/` directory.
///
/// # Returns
///
/// An `AppConfig` with everything that was found. Missing directories or
/// files yield defaults rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid TOML or YAML syntax
/// - A setting is out of range, e.g. a zero rate limit
/// - A pipeline has no stages, repeats a stage name, or shares its name
///   with another pipeline
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let gk_dir = root.join(CONFIG_DIR);

    if !gk_dir.exists() {
        debug!(path = %gk_dir.display(), "no configuration directory, using defaults");
        return Ok(AppConfig::default());
    }

    let settings = load_settings(&gk_dir)?;
    let pipelines = load_pipelines(&gk_dir)?;
    debug!(pipelines = pipelines.len(), "configuration loaded");

    Ok(AppConfig {
        settings,
        pipelines,
    })
}

/// Loads settings from `config.toml`.
fn load_settings(gk_dir: &Path) -> ConfigResult<Settings> {
    let config_path = gk_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(Settings::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path.clone(),
        source,
    })?;

    validate_settings(&settings).map_err(|(key, reason)| ConfigError::InvalidSetting {
        path: config_path,
        key,
        reason,
    })?;

    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<(), (&'static str, String)> {
    if settings.rate_limit.permit_limit == 0 {
        return Err(("rate_limit.permit_limit", "must allow at least one call".to_string()));
    }
    if settings.rate_limit.window_ms == 0 {
        return Err(("rate_limit.window_ms", "window must not be empty".to_string()));
    }
    if settings.orchestration.max_invocations == 0 {
        return Err((
            "orchestration.max_invocations",
            "must allow at least one worker invocation".to_string(),
        ));
    }
    if settings.orchestration.result_timeout_secs == 0 {
        return Err(("orchestration.result_timeout_secs", "must be positive".to_string()));
    }
    if settings.retry.max_delay_ms < settings.retry.base_delay_ms {
        return Err((
            "retry.max_delay_ms",
            format!(
                "{} is below base_delay_ms ({})",
                settings.retry.max_delay_ms, settings.retry.base_delay_ms
            ),
        ));
    }
    Ok(())
}

/// Loads all pipeline definitions from `pipelines/*.yaml`.
fn load_pipelines(gk_dir: &Path) -> ConfigResult<Vec<PipelineDefinition>> {
    let pipelines_dir = gk_dir.join("pipelines");

    if !pipelines_dir.exists() {
        return Ok(Vec::new());
    }

    let mut pipelines = Vec::new();
    let mut names = HashSet::new();

    for entry in WalkDir::new(&pipelines_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: pipelines_dir.clone(),
            source,
        })?;

        let path = entry.path();

        let ext = path.extension().and_then(|s| s.to_str());
        if ext != Some("yaml") && ext != Some("yml") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let pipeline: PipelineDefinition =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        validate_pipeline(&pipeline).map_err(|reason| ConfigError::InvalidConfig {
            path: path.to_path_buf(),
            reason,
        })?;

        if !names.insert(pipeline.name.clone()) {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("duplicate pipeline name '{}'", pipeline.name),
            });
        }

        pipelines.push(pipeline);
    }

    Ok(pipelines)
}

fn validate_pipeline(pipeline: &PipelineDefinition) -> Result<(), String> {
    if pipeline.name.trim().is_empty() {
        return Err("pipeline name must not be empty".to_string());
    }
    if pipeline.stages.is_empty() {
        return Err(format!("pipeline '{}' has no stages", pipeline.name));
    }

    let mut seen = HashSet::new();
    for stage in &pipeline.stages {
        if stage.name.trim().is_empty() {
            return Err(format!("pipeline '{}' has a stage without a name", pipeline.name));
        }
        if !seen.insert(stage.name.as_str()) {
            return Err(format!(
                "pipeline '{}' repeats stage '{}'",
                pipeline.name, stage.name
            ));
        }
    }
    Ok(())
}
