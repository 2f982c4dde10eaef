//! # Engine Module
//!
//! Building blocks of the tree-search engine: the resumable state record, the
//! tunable options, and the contracts this crate expects its collaborators to
//! fulfil.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Convergence epsilons, SPR radius and
//!   cutoff, NNI tunables, with a validating builder
//! - **State Tracking** ([`state`]) - The checkpoint-resident search snapshot
//!   and its totally ordered stage cursor
//! - **Checkpointing** ([`checkpoint`]) - The persistence seam and the stage
//!   gate that enforces persist-before-mutate resume semantics
//! - **Likelihood Kernel** ([`tree`]) - The seam to the tree/model
//!   representation executing likelihood queries and topology moves
//! - **Parallel Coordination** ([`parallel`]) - Coordinator identity and the
//!   collective barrier
//! - **Progress Monitoring** ([`progress`]) - Progress events and reporting
//! - **Radius Heuristics** ([`radius`]) - Pure difficulty-adaptive SPR radius
//!   formulas
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod parallel;
pub mod progress;
pub mod radius;
pub mod state;
pub mod tree;
