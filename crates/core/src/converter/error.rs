//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that a single-hop adapter can raise.
///
/// The executor treats every variant the same way ("this edge failed"); the
/// variants only exist so the message reaching the job ledger is useful.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Input could not be parsed as the source format.
    #[error("Failed to read {format} input: {reason}")]
    Decode { format: String, reason: String },

    /// Output could not be produced in the target format.
    #[error("Failed to write {format} output: {reason}")]
    Encode { format: String, reason: String },

    /// A required host binary is not installed.
    #[error("{tool} is not installed on the host; install it to enable this conversion")]
    ToolMissing { tool: String },

    /// A host binary ran but reported failure.
    #[error("{tool} conversion failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// A host binary exited successfully without producing output.
    #[error("{tool} did not produce output file {path}")]
    NoOutput { tool: String, path: PathBuf },

    /// I/O error while staging files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    /// Creates a decode error.
    pub fn decode(format: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an encode error.
    pub fn encode(format: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a tool failure error.
    pub fn tool_failed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing tool error.
    pub fn tool_missing(tool: impl Into<String>) -> Self {
        Self::ToolMissing { tool: tool.into() }
    }
}
