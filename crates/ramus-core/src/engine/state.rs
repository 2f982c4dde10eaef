use serde::{Deserialize, Serialize};

/// Stage markers of a checkpointed search schedule.
///
/// The ordering is total and the cursor is strictly non-decreasing within one
/// run: each variant doubles as a resume cursor, and a stage whose marker
/// compares below the cursor is skipped entirely on resume.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CheckpointStep {
    #[default]
    BrlenOpt,
    ModOpt1,
    RadiusDetectOrNni,
    ModOpt2,
    FastSpr,
    ModOpt3,
    SlowSpr,
    ModOpt4,
    Finish,
}

/// Tracker for the SPR subtree-cutoff filter, re-based on a reference
/// log-likelihood whenever candidate retention is (re)enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CutoffInfo {
    pub lh_cutoff: f64,
    pub dec_count: usize,
    pub dec_sum: f64,
}

/// Parameters of one SPR round. The `[radius_min, radius_max]` window bounds
/// the neighborhood explored when regrafting a pruned subtree; the round
/// updates `cutoff_info` in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SprRoundParams {
    /// Exhaustive per-candidate branch re-optimization when set.
    pub thorough: bool,
    pub radius_min: usize,
    pub radius_max: usize,
    /// Number of best candidate topologies retained across the round.
    pub ntopol_keep: usize,
    pub subtree_cutoff: f64,
    pub lh_epsilon_brlen_full: f64,
    pub lh_epsilon_brlen_triplet: f64,
    pub cutoff_info: CutoffInfo,
}

impl SprRoundParams {
    pub fn reset_cutoff_info(&mut self, loglh: f64) {
        self.cutoff_info = CutoffInfo {
            lh_cutoff: loglh,
            dec_count: 0,
            dec_sum: 0.0,
        };
    }
}

/// Parameters of one NNI round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NniRoundParams {
    pub tolerance: f64,
    pub lh_epsilon: f64,
}

/// Resumable snapshot of search progress.
///
/// Exactly one record per run is authoritative: it is owned by the checkpoint
/// manager and mutated only through the coordinating participant. Every other
/// participant works on a throwaway clone for the duration of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub loglh: f64,
    pub iteration: u32,
    pub step: CheckpointStep,
    pub best_fast_radius: usize,
    pub spr_params: SprRoundParams,
    pub nni_params: NniRoundParams,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            loglh: f64::NEG_INFINITY,
            iteration: 0,
            step: CheckpointStep::default(),
            best_fast_radius: 0,
            spr_params: SprRoundParams::default(),
            nni_params: NniRoundParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn steps_are_totally_ordered() {
        use CheckpointStep::*;
        let steps = [
            BrlenOpt,
            ModOpt1,
            RadiusDetectOrNni,
            ModOpt2,
            FastSpr,
            ModOpt3,
            SlowSpr,
            ModOpt4,
            Finish,
        ];
        for pair in steps.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(CheckpointStep::default(), BrlenOpt);
    }

    #[test]
    fn cutoff_reset_rebases_on_reference_loglh() {
        let mut params = SprRoundParams {
            cutoff_info: CutoffInfo {
                lh_cutoff: -100.0,
                dec_count: 7,
                dec_sum: 3.5,
            },
            ..Default::default()
        };
        params.reset_cutoff_info(-42.0);
        assert_eq!(params.cutoff_info.lh_cutoff, -42.0);
        assert_eq!(params.cutoff_info.dec_count, 0);
        assert_eq!(params.cutoff_info.dec_sum, 0.0);
    }

    #[test]
    fn state_round_trips_through_a_snapshot_file() {
        let state = SearchState {
            loglh: -12345.678,
            iteration: 3,
            step: CheckpointStep::FastSpr,
            spr_params: SprRoundParams {
                thorough: false,
                radius_min: 6,
                radius_max: 10,
                ntopol_keep: 20,
                subtree_cutoff: 1.0,
                lh_epsilon_brlen_full: 0.1,
                lh_epsilon_brlen_triplet: 1000.0,
                cutoff_info: CutoffInfo {
                    lh_cutoff: -12350.0,
                    dec_count: 2,
                    dec_sum: 0.25,
                },
            },
            nni_params: NniRoundParams {
                tolerance: 0.1,
                lh_epsilon: 0.1,
            },
            best_fast_radius: 10,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search_state.toml");
        fs::write(&path, toml::to_string(&state).unwrap()).unwrap();

        let restored: SearchState = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored, state);
    }
}
