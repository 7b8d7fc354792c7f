//! Global configuration models for `.gatekeeper/config.toml`.
//!
//! This module defines the structure of the global configuration file that
//! controls retry, rate limiting, orchestration and pipeline behaviour.
//! Every section is optional; missing values fall back to the defaults below.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Represents global settings from `.gatekeeper/config.toml`.
///
/// # Example
///
/// ```toml
/// # .gatekeeper/config.toml
/// [retry]
/// max_retries = 5
/// base_delay_ms = 1000
///
/// [rate_limit]
/// permit_limit = 10
/// window_ms = 5000
/// queue_limit = 20
///
/// [orchestration]
/// max_invocations = 5
/// result_timeout_secs = 7200
///
/// [pipeline]
/// auto_chain = true
/// chain_delay_ms = 2000
///
/// [repository]
/// owner = "acme"
/// repo = "service"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(default)]
pub struct Settings {
    pub retry: RetrySettings,
    pub rate_limit: RateLimitSettings,
    pub orchestration: OrchestrationSettings,
    pub pipeline: PipelineSettings,
    pub repository: RepositorySettings,
}

/// Exponential backoff applied to transient remote failures.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for every later retry.
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Fixed-window limiter protecting a downstream dependency.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Calls permitted per window.
    pub permit_limit: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Callers allowed to wait for the next window before new ones are rejected.
    pub queue_limit: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            permit_limit: 10,
            window_ms: 5_000,
            queue_limit: 20,
        }
    }
}

/// Bounds for manager-directed multi-agent orchestration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct OrchestrationSettings {
    /// Maximum worker invocations in one orchestration run.
    pub max_invocations: usize,

    /// How long to wait for the final result. Agent calls are slow, so the
    /// default is two hours.
    pub result_timeout_secs: u64,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            max_invocations: 5,
            result_timeout_secs: 7_200,
        }
    }
}

/// Stage pipeline behaviour.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default)]
pub struct PipelineSettings {
    /// Start the next stage automatically after one completes.
    ///
    /// When false, every `start` runs exactly one stage.
    pub auto_chain: bool,

    /// Pause between automatically chained stages.
    pub chain_delay_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            auto_chain: true,
            chain_delay_ms: 0,
        }
    }
}

/// Repository the release pipeline operates on, passed to executors as context.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(default)]
pub struct RepositorySettings {
    pub owner: String,
    pub repo: String,
}
