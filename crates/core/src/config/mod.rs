//! Configuration loading and management.
//!
//! This module loads settings and pipeline definitions from the
//! `.gatekeeper/` directory structure.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, CONFIG_DIR};
pub use models::{default_release_pipeline, AppConfig, DEFAULT_PIPELINE_NAME};
