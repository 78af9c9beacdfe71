//! Durable record of conversion jobs and their share tokens.

mod sqlite_ledger;
mod store;
mod types;

pub use sqlite_ledger::SqliteJobLedger;
pub use store::{authorize_artifact_access, JobError, JobLedger};
pub use types::{Job, JobStatus, ShareGrant};
