//! Manager-directed multi-agent orchestration.
//!
//! On every turn the manager looks at the shared conversation and either
//! picks a worker with an instruction or finishes with a final answer.
//! Workers run one at a time; their responses are fed back into the
//! conversation through an [`OrchestrationMonitor`].

use super::error::{OrchestrationError, OrchestrationResult};
use super::monitor::OrchestrationMonitor;
use crate::agents::base::{
    Agent, AgentError, AgentEvent, ExecutionContext, ManagerAgent, ManagerContext,
    ManagerDecision, WorkerProfile,
};
use crate::broadcast::Broadcaster;
use crate::cancel::CancellationToken;
use gk_protocol::config_models::OrchestrationSettings;
use gk_protocol::conversation_models::{AuthorRole, ConversationEntry};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Bounds for one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationConfig {
    /// Maximum worker invocations per run.
    pub max_invocations: usize,

    /// How long to wait for the final result.
    pub result_timeout: Duration,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self::from(&OrchestrationSettings::default())
    }
}

impl From<&OrchestrationSettings> for OrchestrationConfig {
    fn from(settings: &OrchestrationSettings) -> Self {
        Self {
            max_invocations: settings.max_invocations,
            result_timeout: Duration::from_secs(settings.result_timeout_secs),
        }
    }
}

/// Per-run invocation accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerState {
    invocations: usize,
    max_invocations: usize,
}

impl ManagerState {
    pub fn new(max_invocations: usize) -> Self {
        Self {
            invocations: 0,
            max_invocations,
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations
    }

    pub fn is_exhausted(&self) -> bool {
        self.invocations >= self.max_invocations
    }

    /// Count one worker invocation. Fails once the bound is reached.
    pub fn record_invocation(&mut self) -> OrchestrationResult<usize> {
        if self.is_exhausted() {
            return Err(OrchestrationError::Exhausted {
                max_invocations: self.max_invocations,
            });
        }
        self.invocations += 1;
        Ok(self.invocations)
    }
}

/// Result of a successful orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationOutcome {
    /// The manager's final answer.
    pub answer: String,

    /// Worker invocations issued.
    pub invocations: usize,

    /// The full conversation, in order.
    pub history: Vec<ConversationEntry>,
}

/// Runs a manager and its workers until the manager finishes.
pub struct MagenticCoordinator {
    manager: Arc<dyn ManagerAgent>,
    workers: Vec<Arc<dyn Agent>>,
    config: OrchestrationConfig,
    broadcaster: Option<Arc<dyn Broadcaster>>,
}

impl MagenticCoordinator {
    pub fn new(manager: Arc<dyn ManagerAgent>, config: OrchestrationConfig) -> Self {
        Self {
            manager,
            workers: Vec::new(),
            config,
            broadcaster: None,
        }
    }

    /// Register a worker. Names are matched exactly.
    pub fn with_worker(mut self, worker: Arc<dyn Agent>) -> Self {
        self.workers.push(worker);
        self
    }

    /// Mirror conversation entries to `broadcaster`.
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    /// Profiles of the registered workers, as shown to the manager.
    pub fn worker_profiles(&self) -> Vec<WorkerProfile> {
        self.workers
            .iter()
            .map(|worker| WorkerProfile {
                name: worker.name().to_string(),
                description: worker.description().to_string(),
            })
            .collect()
    }

    /// A fresh monitor for one run.
    pub fn monitor(&self) -> OrchestrationMonitor {
        match &self.broadcaster {
            Some(broadcaster) => OrchestrationMonitor::new().with_broadcaster(broadcaster.clone()),
            None => OrchestrationMonitor::new(),
        }
    }

    /// Orchestrate `task` until the manager produces a final answer.
    ///
    /// # Errors
    ///
    /// - [`OrchestrationError::Exhausted`] when the manager keeps invoking
    ///   workers past `max_invocations`
    /// - [`OrchestrationError::Timeout`] when no final result arrives within
    ///   `result_timeout`
    /// - [`OrchestrationError::Manager`] / [`OrchestrationError::Worker`] for
    ///   invocation failures
    /// - [`OrchestrationError::Canceled`] when `cancel` fires
    pub async fn run(
        &self,
        task: &str,
        cancel: &CancellationToken,
    ) -> OrchestrationResult<OrchestrationOutcome> {
        if self.workers.is_empty() {
            return Err(OrchestrationError::NoWorkers);
        }

        let mut monitor = self.monitor();
        let timeout = self.config.result_timeout;
        info!(
            manager = self.manager.name(),
            workers = self.workers.len(),
            max_invocations = self.config.max_invocations,
            "orchestration started"
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrchestrationError::Canceled),
            result = tokio::time::timeout(timeout, self.drive(task, &mut monitor)) => match result {
                Ok(result) => result,
                Err(_) => Err(OrchestrationError::Timeout(timeout)),
            },
        };

        match result {
            Ok((answer, invocations)) => {
                info!(invocations, entries = monitor.history().len(), "orchestration finished");
                Ok(OrchestrationOutcome {
                    answer,
                    invocations,
                    history: monitor.into_history(),
                })
            }
            Err(err) => {
                monitor.discard_pending();
                warn!(error = %err, "orchestration failed");
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        task: &str,
        monitor: &mut OrchestrationMonitor,
    ) -> OrchestrationResult<(String, usize)> {
        let profiles = self.worker_profiles();
        let mut state = ManagerState::new(self.config.max_invocations);
        let manager_name = self.manager.name().to_string();

        monitor.record_final(ConversationEntry::new(AuthorRole::User, task));

        loop {
            let context = ManagerContext {
                task,
                workers: &profiles,
                history: monitor.history(),
                invocation_count: state.invocations(),
                max_invocations: self.config.max_invocations,
            };
            let decision = self
                .manager
                .next_step(&context)
                .await
                .map_err(|source| match source {
                    AgentError::Canceled => OrchestrationError::Canceled,
                    source => OrchestrationError::Manager {
                        manager: manager_name.clone(),
                        source,
                    },
                })?;

            match decision {
                ManagerDecision::Finish { answer } => {
                    monitor.record_final(
                        ConversationEntry::new(AuthorRole::Assistant, answer.clone())
                            .with_author(manager_name.as_str()),
                    );
                    return Ok((answer, state.invocations()));
                }
                ManagerDecision::Invoke {
                    worker,
                    instruction,
                } => {
                    let agent = self.find_worker(&worker)?;
                    let turn = state.record_invocation()?;
                    debug!(turn, worker = %worker, "invoking worker");

                    monitor.record_final(
                        ConversationEntry::new(AuthorRole::Assistant, instruction.clone())
                            .with_author(manager_name.as_str()),
                    );
                    let context = ExecutionContext::for_stage(worker.as_str(), task)
                        .with_instruction(instruction)
                        .with_history(monitor.history().to_vec());
                    Self::invoke_worker(agent.as_ref(), &context, monitor).await?;
                }
            }
        }
    }

    fn find_worker(&self, name: &str) -> OrchestrationResult<Arc<dyn Agent>> {
        self.workers
            .iter()
            .find(|worker| worker.name() == name)
            .cloned()
            .ok_or_else(|| OrchestrationError::UnknownWorker(name.to_string()))
    }

    async fn invoke_worker(
        agent: &dyn Agent,
        context: &ExecutionContext,
        monitor: &mut OrchestrationMonitor,
    ) -> OrchestrationResult<()> {
        let worker_error = |source: AgentError| match source {
            AgentError::Canceled => OrchestrationError::Canceled,
            source => OrchestrationError::Worker {
                worker: agent.name().to_string(),
                source,
            },
        };

        let mut stream = agent.execute(context).await.map_err(worker_error)?;
        while let Some(event) = stream.next().await {
            match event {
                Ok(AgentEvent::Message(entry)) => monitor.record_final(entry),
                Ok(AgentEvent::Fragment { fragment, is_final }) => {
                    monitor.record_stream_fragment(fragment, is_final);
                }
                Ok(AgentEvent::Completed) => break,
                Err(err) => {
                    monitor.discard_pending();
                    return Err(worker_error(err));
                }
            }
        }

        // Streams that end without a final fragment still count
        monitor.flush_pending();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::adapters::{MockAgent, MockManager};

    fn invoke(worker: &str, instruction: &str) -> Result<ManagerDecision, AgentError> {
        Ok(ManagerDecision::Invoke {
            worker: worker.to_string(),
            instruction: instruction.to_string(),
        })
    }

    fn finish(answer: &str) -> Result<ManagerDecision, AgentError> {
        Ok(ManagerDecision::Finish {
            answer: answer.to_string(),
        })
    }

    #[test]
    fn test_manager_state_bound() {
        let mut state = ManagerState::new(2);
        assert_eq!(state.record_invocation(), Ok(1));
        assert_eq!(state.record_invocation(), Ok(2));
        assert!(state.is_exhausted());
        assert_eq!(
            state.record_invocation(),
            Err(OrchestrationError::Exhausted { max_invocations: 2 })
        );
        assert_eq!(state.invocations(), 2);
    }

    #[test]
    fn test_config_from_settings() {
        let config = OrchestrationConfig::default();
        assert_eq!(config.max_invocations, 5);
        assert_eq!(config.result_timeout, Duration::from_secs(7_200));
    }

    #[tokio::test]
    async fn test_run_collects_worker_response_and_answer() {
        let worker = MockAgent::streaming("CodeReviewer", &["Looks ", "good"]);
        let manager = MockManager::new(vec![invoke("CodeReviewer", "review v1"), finish("approved")]);
        let coordinator = MagenticCoordinator::new(Arc::new(manager), OrchestrationConfig::default())
            .with_worker(Arc::new(worker.clone()));

        let outcome = coordinator
            .run("review v1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "approved");
        assert_eq!(outcome.invocations, 1);
        assert_eq!(worker.calls(), 1);
        let contents: Vec<_> = outcome.history.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["review v1", "review v1", "Looks good", "approved"]);
        assert_eq!(outcome.history[2].author_name.as_deref(), Some("CodeReviewer"));
    }

    #[tokio::test]
    async fn test_unknown_worker() {
        let manager = MockManager::new(vec![invoke("Nobody", "hi")]);
        let coordinator = MagenticCoordinator::new(Arc::new(manager), OrchestrationConfig::default())
            .with_worker(Arc::new(MockAgent::streaming("CodeReviewer", &["ok"])));

        let result = coordinator.run("task", &CancellationToken::new()).await;
        assert_eq!(result, Err(OrchestrationError::UnknownWorker("Nobody".to_string())));
    }

    #[tokio::test]
    async fn test_no_workers() {
        let coordinator = MagenticCoordinator::new(
            Arc::new(MockManager::new(vec![finish("done")])),
            OrchestrationConfig::default(),
        );
        let result = coordinator.run("task", &CancellationToken::new()).await;
        assert_eq!(result, Err(OrchestrationError::NoWorkers));
    }

    #[tokio::test]
    async fn test_worker_failure_is_reported() {
        let manager = MockManager::new(vec![invoke("Broken", "go")]);
        let coordinator = MagenticCoordinator::new(Arc::new(manager), OrchestrationConfig::default())
            .with_worker(Arc::new(MockAgent::failing("Broken")));

        let result = coordinator.run("task", &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(OrchestrationError::Worker { worker, .. }) if worker == "Broken"
        ));
    }

    #[tokio::test]
    async fn test_canceled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator = MagenticCoordinator::new(
            Arc::new(MockManager::never_finishing("w")),
            OrchestrationConfig::default(),
        )
        .with_worker(Arc::new(MockAgent::streaming("w", &["x"])));

        let result = coordinator.run("task", &cancel).await;
        assert_eq!(result, Err(OrchestrationError::Canceled));
    }
}
