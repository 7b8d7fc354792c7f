//! Stage executors, orchestration agents and the stage registry.
//!
//! Every pipeline stage is bound to an [`AgentExecutor`] through the
//! [`StageRegistry`]. Orchestration uses the [`Agent`] and [`ManagerAgent`]
//! traits instead.

pub mod adapters;
pub mod base;
pub mod registry;

pub use adapters::{
    CommandAgent, CommandExecutor, MagenticExecutor, MockAgent, MockExecutor, RemoteExecutor,
};
pub use base::{
    Agent, AgentError, AgentEvent, AgentExecutor, ExecutionContext, ManagerAgent, ManagerDecision,
};
pub use registry::StageRegistry;
