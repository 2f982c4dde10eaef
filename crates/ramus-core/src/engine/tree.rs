use super::error::EngineError;
use super::state::{NniRoundParams, SprRoundParams};

/// The likelihood kernel: a scored tree plus the operations the search
/// schedules are built from.
///
/// Implementations own the tree, branch-length, and substitution-model
/// representation. Every operation is a blocking, collective call: in a
/// parallel run all participants must invoke it together, and it returns only
/// once the (replicated or partitioned) computation has completed everywhere.
pub trait TreeInfo {
    /// Current log-likelihood of the tree. A query, but takes `&mut self`
    /// because implementations typically refresh internal buffers.
    fn loglh(&mut self) -> Result<f64, EngineError>;

    /// One full re-optimization pass over all substitution-model parameters.
    fn optimize_params_all(&mut self, lh_epsilon: f64) -> Result<(), EngineError>;

    /// Optimizes all branch lengths; returns the new log-likelihood.
    fn optimize_branches(&mut self, lh_epsilon: f64, passes: u32) -> Result<f64, EngineError>;

    /// One round of subtree prune-and-regraft moves within the params'
    /// radius window; updates the cutoff tracker in `params` in place and
    /// returns the new log-likelihood.
    fn spr_round(&mut self, params: &mut SprRoundParams) -> Result<f64, EngineError>;

    /// One round of nearest-neighbor-interchange moves; returns the new
    /// log-likelihood.
    fn nni_round(&mut self, params: &NniRoundParams) -> Result<f64, EngineError>;

    /// Number of tips (leaves) in the tree.
    fn tip_count(&self) -> usize;
}
