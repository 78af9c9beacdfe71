//! Error types for the registry module.

use thiserror::Error;

/// Errors raised by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No direct edge is registered for the pair.
    #[error("Conversion {from}->{to} not registered")]
    EdgeNotFound { from: String, to: String },

    /// No path connects the two labels under the given exclusions.
    #[error("Conversion path {from}->{to} not registered")]
    PathNotFound { from: String, to: String },
}

impl RegistryError {
    pub fn edge_not_found(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::EdgeNotFound {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn path_not_found(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::PathNotFound {
            from: from.into(),
            to: to.into(),
        }
    }
}
