//! Integration tests for manager-directed orchestration.
//!
//! These tests verify that the coordinator:
//! - Never issues more than `max_invocations` worker calls
//! - Reports a result timeout distinctly from invocation failures
//! - Aggregates streamed worker responses into the shared history
//! - Can back a pipeline stage

mod common;

use async_trait::async_trait;
use common::*;
use gk_core::agents::adapters::{MockAgent, MockManager};
use gk_core::agents::base::ManagerContext;
use gk_core::agents::{
    AgentError, AgentEvent, AgentExecutor, MagenticExecutor, ManagerAgent, ManagerDecision,
};
use gk_core::cancel::CancellationToken;
use gk_core::orchestration::{MagenticCoordinator, OrchestrationConfig, OrchestrationError};
use gk_core::pipeline::{StagePipeline, StartOutcome};
use gk_protocol::conversation_models::{AuthorRole, ConversationEntry, StreamFragment};
use std::sync::Arc;
use std::time::Duration;

/// A manager that takes hours to decide.
struct SlowManager;

#[async_trait]
impl ManagerAgent for SlowManager {
    fn name(&self) -> &str {
        "slow-manager"
    }

    async fn next_step(&self, _context: &ManagerContext<'_>) -> Result<ManagerDecision, AgentError> {
        tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
        Ok(ManagerDecision::Finish {
            answer: "too late".to_string(),
        })
    }
}

/// Finishes once it has seen a worker response in the history.
struct ReviewManager;

#[async_trait]
impl ManagerAgent for ReviewManager {
    fn name(&self) -> &str {
        "review-manager"
    }

    async fn next_step(&self, context: &ManagerContext<'_>) -> Result<ManagerDecision, AgentError> {
        let reviewed = context
            .history
            .iter()
            .find(|entry| entry.author_name.as_deref() == Some("CodeReviewer"));

        Ok(match reviewed {
            Some(entry) => ManagerDecision::Finish {
                answer: format!("Summary: {}", entry.content),
            },
            None => ManagerDecision::Invoke {
                worker: context.workers[0].name.clone(),
                instruction: format!("Review: {}", context.task),
            },
        })
    }
}

fn config(max_invocations: usize) -> OrchestrationConfig {
    OrchestrationConfig {
        max_invocations,
        ..OrchestrationConfig::default()
    }
}

#[tokio::test]
async fn test_invocations_never_exceed_bound() {
    let worker = MockAgent::streaming("CodeReviewer", &["still ", "looking"]);
    let coordinator = MagenticCoordinator::new(
        Arc::new(MockManager::never_finishing("CodeReviewer")),
        config(5),
    )
    .with_worker(Arc::new(worker.clone()));

    let result = coordinator.run("review v1.2.3", &CancellationToken::new()).await;

    assert_eq!(
        result,
        Err(OrchestrationError::Exhausted { max_invocations: 5 })
    );
    assert_eq!(worker.calls(), 5);
}

#[tokio::test]
async fn test_finish_on_the_last_allowed_turn_succeeds() {
    let invoke = || {
        Ok(ManagerDecision::Invoke {
            worker: "CodeReviewer".to_string(),
            instruction: "again".to_string(),
        })
    };
    let manager = MockManager::new(vec![
        invoke(),
        invoke(),
        Ok(ManagerDecision::Finish {
            answer: "done".to_string(),
        }),
    ]);
    let coordinator = MagenticCoordinator::new(Arc::new(manager), config(2))
        .with_worker(Arc::new(MockAgent::streaming("CodeReviewer", &["ok"])));

    let outcome = coordinator
        .run("review", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.answer, "done");
    assert_eq!(outcome.invocations, 2);
}

#[tokio::test(start_paused = true)]
async fn test_result_timeout_is_reported_distinctly() {
    let coordinator = MagenticCoordinator::new(
        Arc::new(SlowManager),
        OrchestrationConfig {
            max_invocations: 5,
            result_timeout: Duration::from_secs(120 * 60),
        },
    )
    .with_worker(Arc::new(MockAgent::streaming("CodeReviewer", &["ok"])));

    let result = coordinator.run("review", &CancellationToken::new()).await;

    assert_eq!(
        result,
        Err(OrchestrationError::Timeout(Duration::from_secs(7_200)))
    );
}

#[tokio::test]
async fn test_mixed_worker_events_are_aggregated_in_order() {
    let worker = MockAgent::new(
        "CodeReviewer",
        vec![
            Ok(AgentEvent::Message(
                ConversationEntry::new(AuthorRole::Tool, "diff fetched").with_author("git"),
            )),
            Ok(AgentEvent::Fragment {
                fragment: StreamFragment::text("No ").from_author(AuthorRole::Assistant, "CodeReviewer"),
                is_final: false,
            }),
            Ok(AgentEvent::Fragment {
                fragment: StreamFragment::text("issues found"),
                is_final: true,
            }),
            Ok(AgentEvent::Completed),
        ],
    );
    let coordinator = MagenticCoordinator::new(Arc::new(ReviewManager), config(5))
        .with_worker(Arc::new(worker));

    let outcome = coordinator
        .run("tag v1.2.3", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.answer, "Summary: No issues found");
    assert_eq!(outcome.invocations, 1);
    let speakers: Vec<String> = outcome.history.iter().map(|entry| entry.speaker()).collect();
    assert_eq!(
        speakers,
        vec![
            "user",
            "assistant - review-manager",
            "tool - git",
            "assistant - CodeReviewer",
            "assistant - review-manager",
        ]
    );
}

#[tokio::test]
async fn test_worker_stream_error_is_not_retried() {
    let worker = MockAgent::new(
        "CodeReviewer",
        vec![
            Ok(AgentEvent::Fragment {
                fragment: StreamFragment::text("partial"),
                is_final: false,
            }),
            Err(AgentError::Remote("connection reset".to_string())),
        ],
    );
    let coordinator = MagenticCoordinator::new(Arc::new(ReviewManager), config(5))
        .with_worker(Arc::new(worker.clone()));

    let result = coordinator.run("review", &CancellationToken::new()).await;

    assert!(matches!(result, Err(OrchestrationError::Worker { .. })));
    assert_eq!(worker.calls(), 1);
}

#[tokio::test]
async fn test_coordinator_backs_a_pipeline_stage() {
    let broadcaster = Arc::new(RecordingBroadcaster::default());
    let coordinator = MagenticCoordinator::new(Arc::new(ReviewManager), config(5))
        .with_worker(Arc::new(MockAgent::streaming("CodeReviewer", &["Looks ", "good"])))
        .with_broadcaster(broadcaster.clone());

    let registry = registry_of(vec![(
        "Review",
        Arc::new(MagenticExecutor::new(Arc::new(coordinator))) as Arc<dyn AgentExecutor>,
    )]);
    let pipeline = StagePipeline::new(&pipeline_definition(&["Review"]), &registry, broadcaster.clone())
        .unwrap();

    let outcome = pipeline.start("1.2.3").await.unwrap();

    assert_eq!(outcome, StartOutcome::Finished);
    let messages = broadcaster.messages();
    assert_published(&messages, "[assistant - CodeReviewer] Looks good");
    assert_published(&messages, "Summary: Looks good");
    assert_published(&messages, "Review completed successfully.");
}
