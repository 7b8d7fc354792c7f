//! The state owned by a single pipeline run.

use crate::cancel::CancellationToken;
use gk_protocol::stage_models::{PipelineSnapshot, Stage, StageStatus};
use uuid::Uuid;

/// Ordered stages, a cursor and the cancellation handle of the in-flight attempt.
///
/// Invariants, checked by [`is_consistent`](Self::is_consistent):
/// - stages before the cursor are `Completed`
/// - stages after the cursor are `Pending`
/// - the cursor stage is `Pending`, `InProgress` or `Failed`, or
///   `Completed` once every stage is done
#[derive(Debug)]
pub struct PipelineRun {
    id: Uuid,
    stages: Vec<Stage>,
    current_index: usize,
    task_parameter: Option<String>,
    cancellation: Option<CancellationToken>,
}

impl PipelineRun {
    /// Create a run with every stage pending and the cursor at 0.
    pub fn new<I, S>(stage_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: Uuid::new_v4(),
            stages: stage_names.into_iter().map(Stage::new).collect(),
            current_index: 0,
            task_parameter: None,
            cancellation: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn task_parameter(&self) -> Option<&str> {
        self.task_parameter.as_deref()
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.get(self.current_index)
    }

    /// The current stage is in progress.
    pub fn is_busy(&self) -> bool {
        self.current_stage()
            .is_some_and(|stage| stage.status == StageStatus::InProgress)
    }

    pub fn completed_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| stage.status == StageStatus::Completed)
            .count()
    }

    /// `completed / total * 100`; 0 for a run without stages.
    pub fn progress_percent(&self) -> f64 {
        if self.stages.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.stages.len() as f64 * 100.0
    }

    pub fn all_done(&self) -> bool {
        !self.stages.is_empty() && self.completed_count() == self.stages.len()
    }

    /// Not busy, not done, and the current stage is pending.
    pub fn can_start(&self) -> bool {
        !self.is_busy()
            && !self.all_done()
            && self
                .current_stage()
                .is_some_and(|stage| stage.status == StageStatus::Pending)
    }

    /// Check the cursor/status invariants.
    pub fn is_consistent(&self) -> bool {
        let in_progress = self
            .stages
            .iter()
            .filter(|stage| stage.status == StageStatus::InProgress)
            .count();
        if in_progress > 1 {
            return false;
        }

        let all_done = self.all_done();
        self.stages.iter().enumerate().all(|(i, stage)| {
            if i < self.current_index {
                stage.status == StageStatus::Completed
            } else if i > self.current_index {
                stage.status == StageStatus::Pending
            } else {
                stage.status != StageStatus::Completed || all_done
            }
        })
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            run_id: self.id,
            stages: self.stages.clone(),
            current_index: self.current_index,
            task_parameter: self.task_parameter.clone(),
            busy: self.is_busy(),
            all_done: self.all_done(),
            completed_count: self.completed_count(),
            progress_percent: self.progress_percent(),
            can_start: self.can_start(),
        }
    }

    pub(crate) fn stage_mut(&mut self, index: usize) -> Option<&mut Stage> {
        self.stages.get_mut(index)
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    pub(crate) fn set_task_parameter(&mut self, param: &str) {
        self.task_parameter = Some(param.to_string());
    }

    /// Cancel the previous handle, if any, and install a fresh one.
    pub(crate) fn replace_cancellation(&mut self) -> CancellationToken {
        if let Some(previous) = self.cancellation.take() {
            previous.cancel();
        }
        let token = CancellationToken::new();
        self.cancellation = Some(token.clone());
        token
    }

    /// Signal the current handle. Returns false when there is none.
    pub(crate) fn cancel_in_flight(&mut self) -> bool {
        match &self.cancellation {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether `token` is still the installed handle.
    pub(crate) fn holds_cancellation(&self, token: &CancellationToken) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|current| current.same_handle(token))
    }

    /// Drop the current handle without signalling it.
    pub(crate) fn release_cancellation(&mut self) {
        self.cancellation = None;
    }

    /// Move the cursor forward. Returns false when already at the last stage.
    pub(crate) fn advance(&mut self) -> bool {
        if self.current_index + 1 < self.stages.len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    /// Back to the initial state. Stage statuses are reset by the caller.
    pub(crate) fn rewind(&mut self) {
        self.current_index = 0;
        self.task_parameter = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(statuses: &[StageStatus], cursor: usize) -> PipelineRun {
        let mut run = PipelineRun::new((0..statuses.len()).map(|i| format!("stage-{i}")));
        for (i, status) in statuses.iter().enumerate() {
            run.stages[i].status = *status;
        }
        run.current_index = cursor;
        run
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = PipelineRun::new(["Initialize", "Trust"]);
        assert_eq!(run.current_index(), 0);
        assert!(run.stages().iter().all(|s| s.status == StageStatus::Pending));
        assert!(run.can_start());
        assert!(!run.is_busy());
        assert!(!run.all_done());
        assert_eq!(run.progress_percent(), 0.0);
        assert!(run.is_consistent());
    }

    #[test]
    fn test_derived_values() {
        use StageStatus::*;
        let run = run_with(&[Completed, InProgress, Pending, Pending], 1);
        assert!(run.is_busy());
        assert!(!run.can_start());
        assert_eq!(run.completed_count(), 1);
        assert_eq!(run.progress_percent(), 25.0);
        assert!(run.is_consistent());

        let done = run_with(&[Completed, Completed], 1);
        assert!(done.all_done());
        assert!(!done.can_start());
        assert_eq!(done.progress_percent(), 100.0);
        assert!(done.is_consistent());
    }

    #[test]
    fn test_failed_stage_blocks_manual_start() {
        use StageStatus::*;
        let run = run_with(&[Completed, Failed, Pending], 1);
        assert!(!run.can_start());
        assert!(!run.is_busy());
        assert!(run.is_consistent());
    }

    #[test]
    fn test_inconsistent_runs_are_detected() {
        use StageStatus::*;
        assert!(!run_with(&[Pending, Completed], 0).is_consistent());
        assert!(!run_with(&[Failed, Pending], 1).is_consistent());
        assert!(!run_with(&[Completed, Pending], 0).is_consistent());
        assert!(!run_with(&[InProgress, InProgress], 0).is_consistent());
    }

    #[test]
    fn test_advance_stops_at_last_stage() {
        let mut run = PipelineRun::new(["a", "b"]);
        assert!(run.advance());
        assert_eq!(run.current_index(), 1);
        assert!(!run.advance());
        assert_eq!(run.current_index(), 1);
    }

    #[test]
    fn test_holds_cancellation_tracks_the_installed_handle() {
        let mut run = PipelineRun::new(["a"]);
        let first = run.replace_cancellation();
        assert!(run.holds_cancellation(&first));

        let second = run.replace_cancellation();
        assert!(!run.holds_cancellation(&first));
        assert!(run.holds_cancellation(&second));

        run.release_cancellation();
        assert!(!run.holds_cancellation(&second));
    }

    #[test]
    fn test_replace_cancellation_cancels_previous() {
        let mut run = PipelineRun::new(["a"]);
        let first = run.replace_cancellation();
        let second = run.replace_cancellation();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        assert!(run.cancel_in_flight());
        assert!(second.is_cancelled());

        run.release_cancellation();
        assert!(!run.cancel_in_flight());
    }

    #[test]
    fn test_snapshot_mirrors_run() {
        let mut run = PipelineRun::new(["a", "b"]);
        run.set_task_parameter("1.2.3");
        let snapshot = run.snapshot();
        assert_eq!(snapshot.run_id, run.id());
        assert_eq!(snapshot.stages.len(), 2);
        assert_eq!(snapshot.task_parameter.as_deref(), Some("1.2.3"));
        assert!(snapshot.can_start);

        run.rewind();
        assert_eq!(run.task_parameter(), None);
    }
}
