//! Stage pipeline state machine.
//!
//! The `StagePipeline` walks an ordered list of stages, delegating each to the
//! [`AgentExecutor`] registered for its name. One `start` call drives the
//! whole sequence: stages run strictly one after another until every stage
//! has completed, one fails, or the attempt is canceled. Every transition is
//! mirrored to the [`Broadcaster`].

pub mod error;
pub mod run;

use crate::agents::base::{AgentError, AgentExecutor, ExecutionContext};
use crate::agents::registry::StageRegistry;
use crate::broadcast::Broadcaster;
use crate::cancel::CancellationToken;
use crate::state::stage::{
    begin_stage, cancel_stage, complete_stage, fail_stage, publish_agent_output, reset_stages,
    INVALID_PARAMETER, PIPELINE_FINISHED,
};
use gk_protocol::config_models::PipelineSettings;
use gk_protocol::pipeline_models::{PipelineDefinition, StageDefinition};
use gk_protocol::stage_models::{PipelineSnapshot, Stage, StageStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub use error::{PipelineError, PipelineResult};
pub use run::PipelineRun;

/// How the pipeline moves between stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Start the next stage automatically once one completes. When false,
    /// each `start` runs a single stage.
    pub auto_chain: bool,

    /// Pause between automatically chained stages.
    pub chain_delay: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            auto_chain: true,
            chain_delay: Duration::ZERO,
        }
    }
}

impl From<&PipelineSettings> for PipelineOptions {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            auto_chain: settings.auto_chain,
            chain_delay: Duration::from_millis(settings.chain_delay_ms),
        }
    }
}

/// How a `start` call ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Every stage completed.
    Finished,

    /// Single-step mode: a stage completed and `next_stage` awaits another start.
    Paused { next_stage: String },

    /// The attempt was canceled; `stage` is back to pending.
    Canceled { stage: String },

    /// Nothing to do: the pipeline is busy or already done.
    Ignored,

    /// The task parameter was rejected. Nothing was mutated.
    Rejected { reason: String },
}

struct StageBinding {
    definition: StageDefinition,
    executor: Arc<dyn AgentExecutor>,
}

/// The release pipeline.
///
/// Cheap to clone; clones share the same run, so one task can drive `start`
/// while another cancels or observes it.
#[derive(Clone)]
pub struct StagePipeline {
    run: Arc<Mutex<PipelineRun>>,
    bindings: Arc<[StageBinding]>,
    broadcaster: Arc<dyn Broadcaster>,
    options: PipelineOptions,
}

impl StagePipeline {
    /// Build a pipeline for a definition, resolving every stage's executor.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Validation`] for an empty stage list or duplicate names
    /// - [`PipelineError::UnknownStage`] when a stage has no registered executor
    pub fn new(
        definition: &PipelineDefinition,
        registry: &StageRegistry,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> PipelineResult<Self> {
        Self::from_stages(&definition.stages, registry, broadcaster)
    }

    /// Build a pipeline from an ordered list of stage definitions.
    pub fn from_stages(
        stages: &[StageDefinition],
        registry: &StageRegistry,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> PipelineResult<Self> {
        if stages.is_empty() {
            return Err(PipelineError::Validation(
                "pipeline must define at least one stage".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut bindings = Vec::with_capacity(stages.len());
        for definition in stages {
            if !seen.insert(definition.name.as_str()) {
                return Err(PipelineError::Validation(format!(
                    "duplicate stage '{}'",
                    definition.name
                )));
            }
            bindings.push(StageBinding {
                definition: definition.clone(),
                executor: registry.resolve(&definition.name)?,
            });
        }

        let run = PipelineRun::new(stages.iter().map(|stage| stage.name.clone()));
        debug!(run_id = %run.id(), stages = stages.len(), "pipeline created");

        Ok(Self {
            run: Arc::new(Mutex::new(run)),
            bindings: bindings.into(),
            broadcaster,
            options: PipelineOptions::default(),
        })
    }

    /// Set the chaining options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Start (or resume) the pipeline with a task parameter.
    ///
    /// Runs the current stage and, with automatic chaining, every following
    /// stage. A failed current stage is attempted again.
    ///
    /// # Returns
    ///
    /// - `Rejected` for a blank parameter
    /// - `Ignored` when the current stage is already running or everything is done
    ///   or when a reset or another start took over during the chain delay
    /// - `Canceled` when the attempt was canceled; the stage reverts to pending
    /// - `Paused` after one stage in single-step mode
    /// - `Finished` after the last stage completed
    ///
    /// # Errors
    ///
    /// [`PipelineError::StageExecution`] when a stage fails. The stage is marked
    /// failed and the chain stops there.
    pub async fn start(&self, param: &str) -> PipelineResult<StartOutcome> {
        let param = param.trim();
        if param.is_empty() {
            warn!("start rejected: blank task parameter");
            self.broadcaster.publish(INVALID_PARAMETER);
            return Ok(StartOutcome::Rejected {
                reason: INVALID_PARAMETER.to_string(),
            });
        }

        // Token of the stage that just completed while chaining.
        let mut chained_from: Option<CancellationToken> = None;

        loop {
            let (index, token) = {
                let mut run = self.run.lock().await;

                if let Some(previous) = &chained_from {
                    if previous.is_cancelled() {
                        let index = run.current_index();
                        let pending = run
                            .stages()
                            .get(index)
                            .is_some_and(|stage| stage.status == StageStatus::Pending);
                        // A reset or another start took the run over during the delay
                        if !run.holds_cancellation(previous) || !pending {
                            debug!(run_id = %run.id(), "chain superseded during delay");
                            return Ok(StartOutcome::Ignored);
                        }
                        run.release_cancellation();
                        return Ok(self.cancel_at(&mut run, index));
                    }
                }

                if run.all_done() || run.is_busy() {
                    debug!(run_id = %run.id(), "start ignored");
                    return Ok(StartOutcome::Ignored);
                }

                let index = run.current_index();
                if self.bindings.get(index).is_none() {
                    error!(index, "no binding for stage index");
                    return Err(PipelineError::Internal(format!(
                        "no executor bound at stage index {index}"
                    )));
                }

                let token = run.replace_cancellation();
                run.set_task_parameter(param);
                let stage = run
                    .stage_mut(index)
                    .ok_or_else(|| PipelineError::Internal(format!("no stage at index {index}")))?;
                begin_stage(stage, self.broadcaster.as_ref());
                (index, token)
            };

            let binding = &self.bindings[index];
            let context = ExecutionContext::for_stage(&binding.definition.name, param)
                .with_instruction(binding.definition.render_instruction(param));

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(AgentError::Canceled),
                result = binding.executor.invoke(&context, &token) => result,
            };

            let mut run = self.run.lock().await;
            match result {
                Ok(output) => {
                    let stage = run.stage_mut(index).ok_or_else(|| {
                        PipelineError::Internal(format!("no stage at index {index}"))
                    })?;
                    publish_agent_output(stage, &output, self.broadcaster.as_ref());
                    complete_stage(stage, self.broadcaster.as_ref());

                    if !run.advance() {
                        run.release_cancellation();
                        info!(run_id = %run.id(), "pipeline finished");
                        self.broadcaster.publish(PIPELINE_FINISHED);
                        return Ok(StartOutcome::Finished);
                    }

                    if !self.options.auto_chain {
                        let next_stage = run
                            .current_stage()
                            .map(|stage| stage.name.clone())
                            .unwrap_or_default();
                        return Ok(StartOutcome::Paused { next_stage });
                    }
                }
                Err(AgentError::Canceled) => {
                    return Ok(self.cancel_at(&mut run, index));
                }
                Err(err) => {
                    let reason = err.to_string();
                    let stage = run.stage_mut(index).ok_or_else(|| {
                        PipelineError::Internal(format!("no stage at index {index}"))
                    })?;
                    fail_stage(stage, self.broadcaster.as_ref(), &reason);
                    return Err(PipelineError::StageExecution {
                        stage: stage.name.clone(),
                        reason,
                    });
                }
            }
            drop(run);

            if !self.options.chain_delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(self.options.chain_delay) => {}
                }
            }
            chained_from = Some(token);
        }
    }

    fn cancel_at(&self, run: &mut PipelineRun, index: usize) -> StartOutcome {
        match run.stage_mut(index) {
            Some(stage) => {
                cancel_stage(stage, self.broadcaster.as_ref());
                StartOutcome::Canceled {
                    stage: stage.name.clone(),
                }
            }
            None => StartOutcome::Ignored,
        }
    }

    /// Reset every stage to pending and the cursor to 0.
    ///
    /// No-op while a stage is in progress. Returns whether the reset happened.
    pub async fn reset(&self) -> bool {
        let mut run = self.run.lock().await;
        if run.is_busy() {
            debug!(run_id = %run.id(), "reset ignored while busy");
            return false;
        }

        run.cancel_in_flight();
        run.release_cancellation();
        run.rewind();
        reset_stages(run.stages_mut(), self.broadcaster.as_ref());
        true
    }

    /// Signal cancellation to the in-flight attempt, if any.
    ///
    /// The running stage observes it at its next suspension point and
    /// reverts to pending. Returns false when nothing was in flight.
    pub async fn cancel(&self) -> bool {
        let mut run = self.run.lock().await;
        let signalled = run.cancel_in_flight();
        if signalled {
            info!(run_id = %run.id(), "cancellation requested");
        }
        signalled
    }

    /// Cancel and release the in-flight cancellation handle. Idempotent.
    pub async fn dispose(&self) {
        let mut run = self.run.lock().await;
        run.cancel_in_flight();
        run.release_cancellation();
    }

    pub async fn snapshot(&self) -> PipelineSnapshot {
        self.run.lock().await.snapshot()
    }

    pub async fn stages(&self) -> Vec<Stage> {
        self.run.lock().await.stages().to_vec()
    }

    pub async fn current_index(&self) -> usize {
        self.run.lock().await.current_index()
    }

    pub async fn task_parameter(&self) -> Option<String> {
        self.run.lock().await.task_parameter().map(str::to_string)
    }

    pub async fn is_busy(&self) -> bool {
        self.run.lock().await.is_busy()
    }

    pub async fn completed_count(&self) -> usize {
        self.run.lock().await.completed_count()
    }

    pub async fn progress_percent(&self) -> f64 {
        self.run.lock().await.progress_percent()
    }

    pub async fn all_done(&self) -> bool {
        self.run.lock().await.all_done()
    }

    pub async fn can_start(&self) -> bool {
        self.run.lock().await.can_start()
    }

    /// Check the cursor/status invariants of the run.
    pub async fn is_consistent(&self) -> bool {
        self.run.lock().await.is_consistent()
    }
}
