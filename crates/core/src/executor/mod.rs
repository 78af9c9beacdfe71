//! Chain execution with single-edge fallback.

mod error;
mod runner;

pub use error::{ExecutionError, StepFailure};
pub use runner::{run_chain, ChainExecutor, ExecutionOutcome};
