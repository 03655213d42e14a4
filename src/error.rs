//! Typed error taxonomy for the harness.
//!
//! Every fatal condition named in the component design surfaces as one of
//! these variants. `main` is the only place that turns a `HarnessError`
//! (wrapped in `anyhow::Error` once it crosses an I/O boundary) into a
//! process exit code.

use thiserror::Error;

use crate::engine::EngineCode;

/// Errors the harness itself can raise, independent of engine failures
/// that are wrapped separately in [`HarnessError::Engine`].
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("engine call failed with {code:?}: {context}")]
    Engine { code: EngineCode, context: String },

    #[error("{count} worker(s) failed: {indices:?}")]
    WorkerFailure { indices: Vec<usize>, count: usize },

    #[error("sanity check failed: {0}")]
    Sanity(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub fn worker_failure(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        let count = indices.len();
        HarnessError::WorkerFailure { indices, count }
    }
}
