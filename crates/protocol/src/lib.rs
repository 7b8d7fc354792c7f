//! # gk-protocol
//!
//! Core protocol definitions and data models for gatekeeper.
//!
//! This crate defines all shared data structures used for:
//! - Configuration file parsing (TOML settings, YAML pipeline definitions)
//! - Runtime stage state exposed to UI collaborators
//! - Conversation entries produced by agents during orchestration
//!
//! ## Modules
//!
//! - [`config_models`]: Global settings from config.toml
//! - [`conversation_models`]: Conversation entries and stream fragments
//! - [`pipeline_models`]: Pipeline definitions and their stages
//! - [`stage_models`]: Runtime stage status and pipeline snapshots
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, chrono and uuid
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other gatekeeper crates

pub mod config_models;
pub mod conversation_models;
pub mod pipeline_models;
pub mod stage_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use conversation_models::*;
pub use pipeline_models::*;
pub use stage_models::*;
