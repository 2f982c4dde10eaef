use super::error::EngineError;
use super::state::{CheckpointStep, SearchState};
use super::tree::TreeInfo;

/// The persistence seam: owns the authoritative [`SearchState`] of a run and
/// durably snapshots it together with the tree.
///
/// `persist` must be invoked as the first action of every executed stage (and
/// of every iteration inside a stage's search loop), so that a crash mid-stage
/// resumes the stage from its start rather than from a partial midpoint.
/// Reconstructing the tree itself from the snapshot is the implementation's
/// responsibility.
pub trait CheckpointManager {
    type Tree: TreeInfo;

    fn search_state(&self) -> &SearchState;

    fn search_state_mut(&mut self) -> &mut SearchState;

    /// Durably snapshots the tree and the current search state.
    fn persist(&mut self, tree: &Self::Tree) -> Result<(), EngineError>;
}

/// Whether a stage should execute given the resume cursor.
pub(crate) fn should_run(step: CheckpointStep, resume: CheckpointStep) -> bool {
    step >= resume
}

/// Gate over the stage sequence of one schedule run.
///
/// `enter` admits a stage exactly when its marker is at or past the resume
/// cursor, recording the marker in the state before the caller does any
/// mutating work. Skipped stages leave the state untouched.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageGate {
    resume: CheckpointStep,
}

impl StageGate {
    pub(crate) fn new(resume: CheckpointStep) -> Self {
        Self { resume }
    }

    pub(crate) fn enter(&self, state: &mut SearchState, step: CheckpointStep) -> bool {
        if should_run(step, self.resume) {
            state.step = step;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_at_or_past_the_cursor_run() {
        assert!(should_run(CheckpointStep::FastSpr, CheckpointStep::FastSpr));
        assert!(should_run(CheckpointStep::Finish, CheckpointStep::FastSpr));
        assert!(!should_run(CheckpointStep::ModOpt1, CheckpointStep::FastSpr));
    }

    #[test]
    fn entering_a_stage_records_its_marker() {
        let gate = StageGate::new(CheckpointStep::ModOpt2);
        let mut state = SearchState {
            step: CheckpointStep::ModOpt2,
            ..Default::default()
        };

        assert!(gate.enter(&mut state, CheckpointStep::ModOpt2));
        assert_eq!(state.step, CheckpointStep::ModOpt2);

        assert!(gate.enter(&mut state, CheckpointStep::FastSpr));
        assert_eq!(state.step, CheckpointStep::FastSpr);
    }

    #[test]
    fn skipped_stages_leave_the_cursor_alone() {
        let gate = StageGate::new(CheckpointStep::SlowSpr);
        let mut state = SearchState {
            step: CheckpointStep::SlowSpr,
            ..Default::default()
        };

        assert!(!gate.enter(&mut state, CheckpointStep::BrlenOpt));
        assert!(!gate.enter(&mut state, CheckpointStep::FastSpr));
        assert_eq!(state.step, CheckpointStep::SlowSpr);
    }
}
