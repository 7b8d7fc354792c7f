//! Base executor and agent traits with supporting types.

use crate::cancel::CancellationToken;
use async_trait::async_trait;
use gk_protocol::conversation_models::{ConversationEntry, StreamFragment};
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// Context information passed to executors and agents.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Name of the stage being executed.
    pub stage_name: String,

    /// Free-form task parameter the pipeline was started with (e.g. a tag).
    pub task_parameter: String,

    /// The rendered instruction (prompt).
    pub instruction: String,

    /// Shared conversation so far. Empty for plain stage execution.
    pub history: Vec<ConversationEntry>,
}

impl ExecutionContext {
    /// Create a context for a pipeline stage.
    pub fn for_stage(stage_name: impl Into<String>, task_parameter: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            task_parameter: task_parameter.into(),
            ..Self::default()
        }
    }

    /// Set the instruction.
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Set the shared conversation history.
    pub fn with_history(mut self, history: Vec<ConversationEntry>) -> Self {
        self.history = history;
        self
    }
}

/// Events yielded by a streaming agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// A complete response.
    Message(ConversationEntry),

    /// A piece of a streamed response. `is_final` closes the group.
    Fragment {
        fragment: StreamFragment,
        is_final: bool,
    },

    /// The agent has nothing more to say.
    Completed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent not available: {0}")]
    NotAvailable(String),
    #[error("Remote call failed: {0}")]
    Remote(String),
    #[error("Stream parsing error: {0}")]
    StreamParseError(String),
    #[error("Execution failed: {0}")]
    ExecutionError(String),
    #[error("Orchestration failed: {0}")]
    Orchestration(String),
    #[error("Operation canceled")]
    Canceled,
}

/// Boxed stream of agent events.
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, AgentError>> + Send>>;

/// Executes the work bound to one pipeline stage.
///
/// Implementations should observe `cancel` at their suspension points and
/// return [`AgentError::Canceled`] when it fires.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn invoke(
        &self,
        context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError>;
}

/// A worker agent that can be directed by an orchestration manager.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// What the agent is good at, shown to the manager.
    fn description(&self) -> &str;

    async fn execute(&self, context: &ExecutionContext) -> Result<AgentStream, AgentError>;
}

/// Name and description of a worker, as presented to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerProfile {
    pub name: String,
    pub description: String,
}

/// Everything the manager sees when choosing the next step.
#[derive(Debug)]
pub struct ManagerContext<'a> {
    pub task: &'a str,
    pub workers: &'a [WorkerProfile],
    pub history: &'a [ConversationEntry],
    pub invocation_count: usize,
    pub max_invocations: usize,
}

/// The manager's decision for the next orchestration turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerDecision {
    /// Invoke a worker with an instruction.
    Invoke { worker: String, instruction: String },

    /// Stop and return the final answer.
    Finish { answer: String },
}

/// The orchestration manager: decides which worker runs next and produces
/// the final answer.
#[async_trait]
pub trait ManagerAgent: Send + Sync {
    fn name(&self) -> &str;

    async fn next_step(&self, context: &ManagerContext<'_>) -> Result<ManagerDecision, AgentError>;
}
