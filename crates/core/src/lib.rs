//! # gk-core
//!
//! Core release pipeline engine and multi-agent orchestration for gatekeeper.
//!
//! This crate provides:
//! - A self-driving stage pipeline state machine with cooperative cancellation
//! - Manager-directed multi-agent orchestration with streamed response aggregation
//! - Retry and rate-limit policies for remote calls made by agents
//! - Configuration loading from the `.gatekeeper/` directory
//!
//! ## Modules
//!
//! - [`agents`]: Executor and agent traits, stage registry and adapters
//! - [`broadcast`]: Fan-out progress notifications
//! - [`cancel`]: Cooperative cancellation tokens
//! - [`config`]: Configuration loading and management
//! - [`orchestration`]: Response aggregation and the magentic coordinator
//! - [`pipeline`]: The stage pipeline state machine
//! - [`remote`]: Remote client seam with retry and rate limiting
//! - [`state`]: Stage transitions and their broadcast messages

pub mod agents;
pub mod broadcast;
pub mod cancel;
pub mod config;
pub mod orchestration;
pub mod pipeline;
pub mod remote;
pub mod state;
