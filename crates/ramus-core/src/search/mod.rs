//! Staged maximum-likelihood tree-search drivers.
//!
//! An [`Optimizer`] runs one of four schedules against a likelihood kernel:
//! plain model optimization, a fixed-schedule topology search, a
//! difficulty-adaptive topology search, or a rearrangement-free evaluation of
//! a given topology. The checkpointed schedules persist the search state at
//! every stage boundary and at every iteration of their inner search loops,
//! and resume from the recorded stage after an interrupted run.

use crate::engine::checkpoint::{CheckpointManager, StageGate};
use crate::engine::config::SearchOptions;
use crate::engine::error::EngineError;
use crate::engine::parallel::ParallelContext;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::radius::{spr_radius_limit_adaptive, spr_radius_step_adaptive};
use crate::engine::state::{CheckpointStep, SearchState};
use crate::engine::tree::TreeInfo;
use tracing::{debug, info, instrument};

const FAST_MODOPT_EPS: f64 = 10.0;
const INTERIM_MODOPT_EPS: f64 = 3.0;
const FINAL_MODOPT_EPS: f64 = 0.1;

/// Radius-window slide and ceiling of the fixed (non-adaptive) schedule.
const FIXED_RADIUS_STEP: usize = 5;
const FIXED_RADIUS_LIMIT: usize = 22;

/// Minimum gain for the radius autodetection to keep widening the window.
const AUTODETECT_MIN_GAIN: f64 = 0.1;

/// Relative-improvement floor below which an adaptive SPR loop stops.
const MIN_RELATIVE_GAIN: f64 = 1e-3;
/// Relative-improvement ceiling under which the adaptive fast loop slides
/// its window outward for the next round.
const SLIDE_RELATIVE_GAIN: f64 = 0.01;

/// Candidate topologies retained per SPR round once retention is enabled.
const RETAINED_TOPOLOGIES: usize = 20;

/// Hard bound on every epsilon-gated refinement loop. The convergence tests
/// alone do not bound these loops; exceeding the cap is reported as
/// [`EngineError::Convergence`] instead of spinning on an oscillating or
/// vanishingly-slowly-improving objective.
pub const MAX_EPSILON_ROUNDS: u32 = 1000;

/// Driver for the staged likelihood-climbing schedules.
///
/// Holds the immutable tunables and an optional progress reporter; all
/// mutable search progress lives in the [`SearchState`] owned by the
/// checkpoint manager.
pub struct Optimizer<'a> {
    options: SearchOptions,
    reporter: ProgressReporter<'a>,
}

impl<'a> Optimizer<'a> {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            options,
            reporter: ProgressReporter::new(),
        }
    }

    pub fn with_reporter(options: SearchOptions, reporter: ProgressReporter<'a>) -> Self {
        Self { options, reporter }
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Repeatedly re-optimizes all model parameters until the log-likelihood
    /// gain of a full pass drops to `lh_epsilon` or below. Returns the final
    /// log-likelihood.
    #[instrument(skip_all, name = "model_optimization")]
    pub fn optimize_model<T: TreeInfo>(
        &self,
        tree: &mut T,
        lh_epsilon: f64,
    ) -> Result<f64, EngineError> {
        let mut new_loglh = tree.loglh()?;
        let mut rounds = 0u32;
        loop {
            let cur_loglh = new_loglh;
            tree.optimize_params_all(lh_epsilon)?;
            new_loglh = tree.loglh()?;
            rounds += 1;
            debug!(round = rounds, loglh = new_loglh, "model parameters re-optimized");

            if new_loglh - cur_loglh <= lh_epsilon {
                break;
            }
            if rounds >= MAX_EPSILON_ROUNDS {
                return Err(EngineError::Convergence { rounds });
            }
        }
        Ok(new_loglh)
    }

    /// Fixed-schedule topology search: branch-length and model warm-up,
    /// fast-SPR radius autodetection (unless the radius is user-fixed),
    /// epsilon-converged fast SPR rounds, then thorough SPR rounds over a
    /// growing radius window, and a final tight model optimization.
    #[instrument(skip_all, name = "topology_search")]
    pub fn optimize_topology<C, P>(
        &self,
        tree: &mut C::Tree,
        cm: &mut C,
        parallel: &P,
    ) -> Result<f64, EngineError>
    where
        C: CheckpointManager,
        P: ParallelContext,
    {
        let coordinator = parallel.is_coordinator();
        let mut state = cm.search_state().clone();
        parallel.barrier();

        state.spr_params.lh_epsilon_brlen_full = self.options.lh_epsilon;
        state.spr_params.lh_epsilon_brlen_triplet = self.options.lh_epsilon_brlen_triplet;

        let gate = StageGate::new(state.step);
        state.loglh = tree.loglh()?;

        if gate.enter(&mut state, CheckpointStep::BrlenOpt) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            self.phase_start("branch length optimization", state.loglh);
            state.loglh = tree.optimize_branches(FAST_MODOPT_EPS, 1)?;
            self.reporter.report(Progress::PhaseFinish);
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt1) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(loglh = state.loglh, lh_epsilon = FAST_MODOPT_EPS, "model parameter optimization");
            state.loglh = self.optimize_model(tree, FAST_MODOPT_EPS)?;
            state.iteration = 0;
        }

        let radius_limit = FIXED_RADIUS_LIMIT.min(tree.tip_count().saturating_sub(3));

        if let Some(user_radius) = self.options.spr_radius {
            state.best_fast_radius = user_radius;
        } else if gate.enter(&mut state, CheckpointStep::RadiusDetectOrNni) {
            if state.iteration == 0 {
                state.spr_params.thorough = false;
                state.spr_params.radius_min = 1;
                state.spr_params.radius_max = FIXED_RADIUS_STEP;
                state.best_fast_radius = FIXED_RADIUS_STEP;
                state.spr_params.ntopol_keep = 0;
                state.spr_params.subtree_cutoff = 0.0;
            }

            let mut best_loglh = state.loglh;
            while state.spr_params.radius_min < radius_limit {
                self.save_checkpoint(cm, tree, &state, coordinator)?;
                state.iteration += 1;
                info!(
                    round = state.iteration,
                    radius = state.spr_params.radius_max,
                    loglh = best_loglh,
                    "radius autodetection SPR round"
                );
                self.reporter.report(Progress::SprRound {
                    iteration: state.iteration,
                    radius: state.spr_params.radius_max,
                    thorough: false,
                    loglh: best_loglh,
                });
                state.loglh = tree.spr_round(&mut state.spr_params)?;

                if state.loglh - best_loglh > AUTODETECT_MIN_GAIN {
                    state.best_fast_radius = state.spr_params.radius_max;
                    state.spr_params.radius_min += FIXED_RADIUS_STEP;
                    state.spr_params.radius_max += FIXED_RADIUS_STEP;
                    best_loglh = state.loglh;
                } else {
                    break;
                }
            }
        }

        info!(
            radius = state.best_fast_radius,
            source = if self.options.spr_radius.is_some() {
                "user-specified"
            } else {
                "autodetect"
            },
            loglh = state.loglh,
            "SPR radius for fast rounds"
        );

        if gate.enter(&mut state, CheckpointStep::ModOpt2) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(loglh = state.loglh, lh_epsilon = INTERIM_MODOPT_EPS, "model parameter optimization");
            state.loglh = self.optimize_model(tree, INTERIM_MODOPT_EPS)?;

            state.iteration = 0;
            state.spr_params.thorough = false;
            state.spr_params.radius_min = 1;
            state.spr_params.radius_max = state.best_fast_radius;
            state.spr_params.ntopol_keep = RETAINED_TOPOLOGIES;
            state.spr_params.subtree_cutoff = self.options.spr_cutoff;
            state.spr_params.reset_cutoff_info(state.loglh);
        }

        if gate.enter(&mut state, CheckpointStep::FastSpr) {
            loop {
                self.save_checkpoint(cm, tree, &state, coordinator)?;
                state.iteration += 1;
                let old_loglh = state.loglh;
                self.report_spr_round(&state);
                state.loglh = tree.spr_round(&mut state.spr_params)?;
                state.loglh = tree.optimize_branches(self.options.lh_epsilon, 1)?;

                if state.loglh - old_loglh <= self.options.lh_epsilon {
                    break;
                }
                self.check_round_cap(state.iteration)?;
            }
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt3) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(loglh = state.loglh, lh_epsilon = 1.0, "model parameter optimization");
            state.loglh = self.optimize_model(tree, 1.0)?;

            state.spr_params.thorough = true;
            state.spr_params.radius_min = 1;
            state.spr_params.radius_max = FIXED_RADIUS_STEP;
            state.iteration = 0;
        }

        if gate.enter(&mut state, CheckpointStep::SlowSpr) {
            loop {
                self.save_checkpoint(cm, tree, &state, coordinator)?;
                state.iteration += 1;
                let old_loglh = state.loglh;
                self.report_spr_round(&state);
                state.loglh = tree.spr_round(&mut state.spr_params)?;
                state.loglh = tree.optimize_branches(self.options.lh_epsilon, 1)?;

                if state.loglh - old_loglh > self.options.lh_epsilon {
                    // Improvement in thorough mode: restart from the
                    // innermost window.
                    state.spr_params.radius_min = 1;
                    state.spr_params.radius_max = FIXED_RADIUS_STEP;
                } else {
                    // Stagnation: move the window past the explored radii.
                    state.spr_params.radius_min = state.spr_params.radius_max + 1;
                    state.spr_params.radius_max += FIXED_RADIUS_STEP;
                }

                if state.spr_params.radius_min >= radius_limit {
                    break;
                }
                self.check_round_cap(state.iteration)?;
            }
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt4) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(loglh = state.loglh, lh_epsilon = FINAL_MODOPT_EPS, "model parameter optimization");
            state.loglh = self.optimize_model(tree, FINAL_MODOPT_EPS)?;
        }

        if gate.enter(&mut state, CheckpointStep::Finish) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
        }

        Ok(state.loglh)
    }

    /// Difficulty-adaptive topology search. `difficulty` is an externally
    /// estimated hardness score in `[0, 1]`; datasets near the extremes get
    /// NNI-flavored schedules with shallow SPR radii, intermediate ones get
    /// deep SPR exploration.
    #[instrument(skip_all, name = "adaptive_topology_search")]
    pub fn optimize_topology_adaptive<C, P>(
        &self,
        tree: &mut C::Tree,
        cm: &mut C,
        parallel: &P,
        difficulty: f64,
    ) -> Result<f64, EngineError>
    where
        C: CheckpointManager,
        P: ParallelContext,
    {
        let easy_or_difficult = difficulty <= 0.3 || difficulty >= 0.7;
        info!(difficulty, easy_or_difficult, "starting adaptive topology search");

        let coordinator = parallel.is_coordinator();
        let mut state = cm.search_state().clone();
        parallel.barrier();

        state.spr_params.lh_epsilon_brlen_full = self.options.lh_epsilon;
        state.spr_params.lh_epsilon_brlen_triplet = self.options.lh_epsilon_brlen_triplet;
        state.nni_params.tolerance = self.options.nni_tolerance;
        state.nni_params.lh_epsilon = self.options.nni_epsilon;

        let gate = StageGate::new(state.step);
        state.loglh = tree.loglh()?;

        if gate.enter(&mut state, CheckpointStep::BrlenOpt) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            self.phase_start("branch length optimization", state.loglh);
            state.loglh = tree.optimize_branches(FAST_MODOPT_EPS, 1)?;
            self.reporter.report(Progress::PhaseFinish);
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt1) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(loglh = state.loglh, lh_epsilon = FAST_MODOPT_EPS, "model parameter optimization");
            state.loglh = self.optimize_model(tree, FAST_MODOPT_EPS)?;
            state.iteration = 0;
        }

        // Datasets at either end of the difficulty range open with one NNI
        // round instead of radius autodetection.
        if gate.enter(&mut state, CheckpointStep::RadiusDetectOrNni) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            if easy_or_difficult {
                self.nni(tree, &mut state)?;
            }
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt2) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            if easy_or_difficult {
                info!(loglh = state.loglh, lh_epsilon = INTERIM_MODOPT_EPS, "model parameter optimization");
                state.loglh = self.optimize_model(tree, INTERIM_MODOPT_EPS)?;
            }
        }

        let radius_limit =
            spr_radius_limit_adaptive(difficulty).min(tree.tip_count().saturating_sub(3));
        let mut radius_step = spr_radius_step_adaptive(radius_limit, false);

        if gate.enter(&mut state, CheckpointStep::FastSpr) {
            if state.iteration == 0 {
                state.spr_params.thorough = false;
                state.spr_params.radius_min = 1;
                state.spr_params.radius_max = radius_step;
                state.spr_params.ntopol_keep = 0;
                state.spr_params.subtree_cutoff = 0.0;
            }

            let mut keep_going = true;
            while keep_going {
                self.save_checkpoint(cm, tree, &state, coordinator)?;
                state.iteration += 1;
                let old_loglh = state.loglh;
                self.report_spr_round(&state);
                state.loglh = tree.spr_round(&mut state.spr_params)?;

                if state.spr_params.radius_max > 2 * radius_step {
                    self.nni(tree, &mut state)?;
                }

                let gain = state.loglh - old_loglh;
                let relative_gain = gain / state.loglh.abs();
                keep_going = gain > self.options.lh_epsilon && relative_gain >= MIN_RELATIVE_GAIN;

                // A normal-difficulty search that stalls in its very first
                // window gets one forced retry at a wider radius before
                // giving up on fast rounds.
                if !keep_going
                    && !easy_or_difficult
                    && state.spr_params.radius_max == radius_step
                    && radius_step < radius_limit
                {
                    state.spr_params.radius_min += radius_step;
                    state.spr_params.radius_max += radius_step;
                    keep_going = true;
                    self.check_round_cap(state.iteration)?;
                    continue;
                }

                if relative_gain <= SLIDE_RELATIVE_GAIN
                    && state.spr_params.radius_min + radius_step < radius_limit
                {
                    state.spr_params.radius_min += radius_step;
                    state.spr_params.radius_max += radius_step;
                }
                if keep_going {
                    self.check_round_cap(state.iteration)?;
                }
            }
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt3) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(loglh = state.loglh, lh_epsilon = INTERIM_MODOPT_EPS, "model parameter optimization");
            state.loglh = self.optimize_model(tree, INTERIM_MODOPT_EPS)?;

            radius_step = spr_radius_step_adaptive(radius_limit, true);
            state.iteration = 0;
            state.spr_params.thorough = true;
            state.spr_params.radius_min = 1;
            state.spr_params.radius_max = radius_step;
            state.spr_params.ntopol_keep = RETAINED_TOPOLOGIES;
            state.spr_params.subtree_cutoff = self.options.spr_cutoff;
            state.spr_params.reset_cutoff_info(state.loglh);
        }

        if gate.enter(&mut state, CheckpointStep::SlowSpr) {
            loop {
                self.save_checkpoint(cm, tree, &state, coordinator)?;
                state.iteration += 1;
                let old_loglh = state.loglh;
                self.report_spr_round(&state);
                state.loglh = tree.spr_round(&mut state.spr_params)?;

                if state.spr_params.radius_min > radius_step {
                    self.nni(tree, &mut state)?;
                }

                state.loglh = tree.optimize_branches(self.options.lh_epsilon, 1)?;

                let gain = state.loglh - old_loglh;
                let relative_gain = gain / state.loglh.abs();
                let improved = gain > self.options.lh_epsilon;

                if !improved
                    || (state.spr_params.radius_min + radius_step < radius_limit
                        && relative_gain <= MIN_RELATIVE_GAIN)
                {
                    state.spr_params.radius_min = state.spr_params.radius_max + 1;
                    state.spr_params.radius_max += radius_step;
                }

                if state.spr_params.radius_min >= radius_limit {
                    break;
                }
                self.check_round_cap(state.iteration)?;
            }
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt4) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(loglh = state.loglh, lh_epsilon = FINAL_MODOPT_EPS, "model parameter optimization");
            state.loglh = self.optimize_model(tree, FINAL_MODOPT_EPS)?;
        }

        if gate.enter(&mut state, CheckpointStep::Finish) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
        }

        Ok(state.loglh)
    }

    /// Scores a fixed topology: branch-length optimization and one model
    /// optimization at the configured epsilon, no rearrangements.
    #[instrument(skip_all, name = "evaluation")]
    pub fn evaluate<C, P>(
        &self,
        tree: &mut C::Tree,
        cm: &mut C,
        parallel: &P,
    ) -> Result<f64, EngineError>
    where
        C: CheckpointManager,
        P: ParallelContext,
    {
        let coordinator = parallel.is_coordinator();
        let mut state = cm.search_state().clone();
        parallel.barrier();

        let gate = StageGate::new(state.step);
        state.loglh = tree.loglh()?;

        if gate.enter(&mut state, CheckpointStep::BrlenOpt) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            self.phase_start("branch length optimization", state.loglh);
            state.loglh = tree.optimize_branches(FAST_MODOPT_EPS, 1)?;
            self.reporter.report(Progress::PhaseFinish);
        }

        if gate.enter(&mut state, CheckpointStep::ModOpt1) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
            info!(
                loglh = state.loglh,
                lh_epsilon = self.options.lh_epsilon,
                "model parameter optimization"
            );
            state.loglh = self.optimize_model(tree, self.options.lh_epsilon)?;
        }

        if gate.enter(&mut state, CheckpointStep::Finish) {
            self.save_checkpoint(cm, tree, &state, coordinator)?;
        }

        Ok(state.loglh)
    }

    /// One NNI round with the parameters held in the state.
    fn nni<T: TreeInfo>(&self, tree: &mut T, state: &mut SearchState) -> Result<(), EngineError> {
        let params = state.nni_params;
        info!(
            tolerance = params.tolerance,
            lh_epsilon = params.lh_epsilon,
            loglh = state.loglh,
            "NNI round"
        );
        self.reporter.report(Progress::NniRound {
            tolerance: params.tolerance,
            lh_epsilon: params.lh_epsilon,
            loglh: state.loglh,
        });
        state.loglh = tree.nni_round(&params)?;
        Ok(())
    }

    /// Copies the working state into the manager (coordinator only, keeping
    /// the single-writer contract) and snapshots tree + state durably. Every
    /// stage and every search-round iteration starts here, so an interrupted
    /// run replays at most one stage iteration.
    fn save_checkpoint<C: CheckpointManager>(
        &self,
        cm: &mut C,
        tree: &C::Tree,
        state: &SearchState,
        coordinator: bool,
    ) -> Result<(), EngineError> {
        if coordinator {
            cm.search_state_mut().clone_from(state);
        }
        cm.persist(tree)
    }

    fn phase_start(&self, name: &'static str, loglh: f64) {
        info!(loglh, phase = name, "starting phase");
        self.reporter.report(Progress::PhaseStart { name, loglh });
    }

    fn report_spr_round(&self, state: &SearchState) {
        let kind = if state.spr_params.thorough { "slow" } else { "fast" };
        info!(
            kind,
            round = state.iteration,
            radius = state.spr_params.radius_max,
            loglh = state.loglh,
            "SPR round"
        );
        self.reporter.report(Progress::SprRound {
            iteration: state.iteration,
            radius: state.spr_params.radius_max,
            thorough: state.spr_params.thorough,
            loglh: state.loglh,
        });
    }

    fn check_round_cap(&self, rounds: u32) -> Result<(), EngineError> {
        if rounds >= MAX_EPSILON_ROUNDS {
            Err(EngineError::Convergence { rounds })
        } else {
            Ok(())
        }
    }
}
