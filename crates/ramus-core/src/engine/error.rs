use thiserror::Error;

use super::config::ConfigError;

/// Failures surfaced by the search engine.
///
/// The engine performs no local recovery: any collaborator failure is fatal
/// for the current run, and the only recovery path is an external restart
/// followed by resume from the last persisted checkpoint.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("likelihood kernel operation '{op}' failed: {message}")]
    Likelihood { op: &'static str, message: String },

    #[error("checkpoint persistence failed: {0}")]
    Checkpoint(String),

    #[error("search failed to converge after {rounds} rounds")]
    Convergence { rounds: u32 },

    #[error("invalid search configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}
