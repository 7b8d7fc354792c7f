//! Mock executor and agent implementations for testing.

use crate::agents::base::{
    Agent, AgentError, AgentEvent, AgentExecutor, AgentStream, ExecutionContext, ManagerAgent,
    ManagerContext, ManagerDecision,
};
use crate::cancel::CancellationToken;
use async_trait::async_trait;
use gk_protocol::conversation_models::{AuthorRole, StreamFragment};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug)]
enum MockBehavior {
    Succeed(String),
    Fail(AgentError),
    WaitForCancel,
}

/// A stage executor with a fixed outcome.
///
/// Every clone shares the same invocation counter.
#[derive(Clone, Debug)]
pub struct MockExecutor {
    behavior: MockBehavior,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockExecutor {
    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Succeeds immediately with `output`.
    pub fn succeed(output: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Succeed(output.into()))
    }

    /// Fails with [`AgentError::ExecutionError`].
    pub fn fail(message: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fail(AgentError::ExecutionError(message.into())))
    }

    /// Fails with the given error.
    pub fn error(error: AgentError) -> Self {
        Self::with_behavior(MockBehavior::Fail(error))
    }

    /// Never finishes on its own; returns [`AgentError::Canceled`] once cancelled.
    pub fn wait_for_cancel() -> Self {
        Self::with_behavior(MockBehavior::WaitForCancel)
    }

    /// Sleep before producing the outcome. The sleep observes cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `invoke` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentExecutor for MockExecutor {
    async fn invoke(
        &self,
        _context: &ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        match &self.behavior {
            MockBehavior::Succeed(output) => Ok(output.clone()),
            MockBehavior::Fail(error) => Err(error.clone()),
            MockBehavior::WaitForCancel => {
                cancel.cancelled().await;
                Err(AgentError::Canceled)
            }
        }
    }
}

/// A worker agent replaying a fixed list of events.
#[derive(Clone)]
pub struct MockAgent {
    name: String,
    description: String,
    available: bool,
    events: Vec<Result<AgentEvent, AgentError>>,
    calls: Arc<AtomicUsize>,
}

impl MockAgent {
    pub fn new(name: &str, events: Vec<Result<AgentEvent, AgentError>>) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Mock agent {name}"),
            available: true,
            events,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Streams `chunks` as one fragment group, then completes.
    pub fn streaming(name: &str, chunks: &[&str]) -> Self {
        let last = chunks.len().saturating_sub(1);
        let mut events: Vec<Result<AgentEvent, AgentError>> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let fragment = if i == 0 {
                    StreamFragment::text(*chunk).from_author(AuthorRole::Assistant, name)
                } else {
                    StreamFragment::text(*chunk)
                };
                Ok(AgentEvent::Fragment {
                    fragment,
                    is_final: i == last,
                })
            })
            .collect();
        events.push(Ok(AgentEvent::Completed));
        Self::new(name, events)
    }

    pub fn unavailable(name: &str) -> Self {
        let mut agent = Self::new(name, Vec::new());
        agent.available = false;
        agent
    }

    pub fn failing(name: &str) -> Self {
        Self::new(
            name,
            vec![Err(AgentError::ExecutionError("Mock failure".to_string()))],
        )
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Number of times `execute` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, _context: &ExecutionContext) -> Result<AgentStream, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(AgentError::NotAvailable(format!(
                "Mock agent {} not available",
                self.name
            )));
        }

        let events = self.events.clone();
        Ok(Box::pin(tokio_stream::iter(events)))
    }
}

/// A manager replaying scripted decisions.
///
/// Once the script runs out it keeps repeating the last decision, which makes
/// a manager that never finishes easy to build.
pub struct MockManager {
    name: String,
    decisions: Mutex<VecDeque<Result<ManagerDecision, AgentError>>>,
    last: Mutex<Option<Result<ManagerDecision, AgentError>>>,
}

impl MockManager {
    pub fn new(decisions: Vec<Result<ManagerDecision, AgentError>>) -> Self {
        Self {
            name: "manager".to_string(),
            decisions: Mutex::new(decisions.into()),
            last: Mutex::new(None),
        }
    }

    /// Invokes `worker` forever.
    pub fn never_finishing(worker: &str) -> Self {
        Self::new(vec![Ok(ManagerDecision::Invoke {
            worker: worker.to_string(),
            instruction: "keep going".to_string(),
        })])
    }
}

#[async_trait]
impl ManagerAgent for MockManager {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_step(&self, _context: &ManagerContext<'_>) -> Result<ManagerDecision, AgentError> {
        let next = self
            .decisions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match next {
            Some(decision) => {
                *last = Some(decision.clone());
                decision
            }
            None => last.clone().unwrap_or_else(|| {
                Err(AgentError::ExecutionError("Mock manager has no decisions".to_string()))
            }),
        }
    }
}
