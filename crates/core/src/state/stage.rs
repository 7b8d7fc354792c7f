//! Stage state machine transitions.
//!
//! Each transition updates a [`Stage`] and mirrors the change as a
//! human-readable broadcast message.

use crate::broadcast::Broadcaster;
use gk_protocol::stage_models::{Stage, StageStatus};
use tracing::{info, warn};

pub const PIPELINE_FINISHED: &str = "Pipeline finished.";
pub const PIPELINE_RESET: &str = "Pipeline reset.";
pub const INVALID_PARAMETER: &str = "Please enter a valid task parameter.";

/// Transition to InProgress and announce the stage.
pub fn begin_stage(stage: &mut Stage, broadcaster: &dyn Broadcaster) {
    stage.status = StageStatus::InProgress;
    info!(stage = %stage.name, "stage started");
    broadcaster.publish(&format!("Starting {}...", stage.name));
}

/// Mark the stage as completed.
pub fn complete_stage(stage: &mut Stage, broadcaster: &dyn Broadcaster) {
    stage.status = StageStatus::Completed;
    info!(stage = %stage.name, "stage completed");
    broadcaster.publish(&format!("{} completed successfully.", stage.name));
}

/// Mark the stage as failed with a reason.
pub fn fail_stage(stage: &mut Stage, broadcaster: &dyn Broadcaster, reason: &str) {
    stage.status = StageStatus::Failed;
    warn!(stage = %stage.name, reason, "stage failed");
    broadcaster.publish(&format!("{} failed: {reason}", stage.name));
}

/// Revert a canceled stage to Pending. Cancellation is not a failure.
pub fn cancel_stage(stage: &mut Stage, broadcaster: &dyn Broadcaster) {
    stage.status = StageStatus::Pending;
    info!(stage = %stage.name, "stage canceled");
    broadcaster.publish(&format!("{} canceled.", stage.name));
}

/// Set every stage back to Pending.
pub fn reset_stages(stages: &mut [Stage], broadcaster: &dyn Broadcaster) {
    for stage in stages.iter_mut() {
        stage.status = StageStatus::Pending;
    }
    info!(stages = stages.len(), "pipeline reset");
    broadcaster.publish(PIPELINE_RESET);
}

/// Forward an agent's response to observers.
pub fn publish_agent_output(stage: &Stage, output: &str, broadcaster: &dyn Broadcaster) {
    let output = output.trim();
    if output.is_empty() {
        return;
    }
    info!(stage = %stage.name, bytes = output.len(), "agent responded");
    broadcaster.publish(output);
}
