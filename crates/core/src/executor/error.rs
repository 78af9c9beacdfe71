use thiserror::Error;

use crate::registry::{EdgeKey, RegistryError};

/// One adapter step that failed while running a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub edge: EdgeKey,
    pub step_index: usize,
    pub message: String,
}

/// Errors from planning or executing a conversion.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// No chain connects the two labels.
    #[error(transparent)]
    NoRoute(#[from] RegistryError),

    /// An adapter failed and no alternate chain succeeded.
    ///
    /// Displays the adapter's own message unchanged.
    #[error("{message}")]
    AdapterFailed {
        edge: EdgeKey,
        message: String,
        chains_tried: usize,
    },
}

impl ExecutionError {
    pub(crate) fn from_failure(failure: StepFailure, chains_tried: usize) -> Self {
        Self::AdapterFailed {
            edge: failure.edge,
            message: failure.message,
            chains_tried,
        }
    }
}
