//! Errors raised while loading `.gatekeeper/` configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// `config.toml` is not valid TOML or does not match [`Settings`](gk_protocol::config_models::Settings).
    #[error("Malformed settings in {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A pipeline file is not valid YAML or does not describe a pipeline.
    #[error("Malformed pipeline definition in {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Cannot list pipeline definitions in {path}: {source}")]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// A setting parsed but its value cannot drive the pipeline, e.g. a
    /// rate limit of zero calls per window.
    #[error("Invalid setting `{key}` in {path}: {reason}")]
    InvalidSetting {
        path: PathBuf,
        key: &'static str,
        reason: String,
    },

    /// A pipeline parsed but is unusable: no stages, a repeated stage or a
    /// name shared with another pipeline.
    #[error("Invalid configuration in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
