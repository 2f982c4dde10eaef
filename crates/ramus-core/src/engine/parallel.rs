/// The parallel group a search participates in.
///
/// Exactly one participant per group is the coordinator; only the coordinator
/// reads and writes the authoritative [`SearchState`](super::state::SearchState)
/// held by the checkpoint manager, while everyone else runs the same schedule
/// on a local clone. How the group is formed (threads, processes, ranks) is
/// the embedding system's concern.
pub trait ParallelContext {
    fn is_coordinator(&self) -> bool;

    /// Blocks until every participant of the group has arrived. No timeout:
    /// a missing participant stalls the run, and abort is process-granular.
    fn barrier(&self);
}

/// Single-participant context: always the coordinator, barrier is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialContext;

impl ParallelContext for SerialContext {
    fn is_coordinator(&self) -> bool {
        true
    }

    fn barrier(&self) {}
}
