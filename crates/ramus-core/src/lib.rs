//! # Ramus Core Library
//!
//! A heuristic tree-topology search engine for maximum-likelihood phylogenetic
//! inference: given a scored tree (topology, branch lengths, substitution-model
//! parameters), it alternates local topology rearrangements with numerical
//! parameter re-optimization to climb the log-likelihood surface, while staying
//! resumable after interruption and coordinated across parallel participants.
//!
//! ## Architectural Philosophy
//!
//! The library is split into two layers with a strict separation of concerns:
//!
//! - **[`engine`]: The Foundation.** Contains the resumable search record
//!   (`SearchState` and its stage cursor), the tunable search options, the
//!   progress-reporting machinery, and the collaborator seams: the likelihood
//!   kernel (`TreeInfo`), checkpoint persistence (`CheckpointManager`), and
//!   the parallel group (`ParallelContext`). The engine never computes a
//!   likelihood, touches a tree data structure, or writes a file itself.
//!
//! - **[`search`]: The Drivers.** The user-facing layer. An [`search::Optimizer`]
//!   runs fixed and difficulty-adaptive multi-stage search schedules over a
//!   `TreeInfo`, persisting progress through a `CheckpointManager` at every
//!   stage boundary so an aborted run can resume from its last completed step.

pub mod engine;
pub mod search;
