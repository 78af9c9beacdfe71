//! Job ledger trait and errors.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::{Job, ShareGrant};

/// Error type for job ledger operations.
#[derive(Debug)]
pub enum JobError {
    /// Job not found.
    NotFound(i64),
    /// Cannot perform operation due to current state.
    InvalidState {
        job_id: i64,
        current_state: String,
        operation: String,
    },
    /// Share token missing, mismatched or expired.
    AuthFailure(String),
    /// Database error.
    Database(String),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::NotFound(id) => write!(f, "Job not found: {}", id),
            JobError::InvalidState {
                job_id,
                current_state,
                operation,
            } => write!(
                f,
                "Cannot {} job {}: {}",
                operation, job_id, current_state
            ),
            JobError::AuthFailure(reason) => write!(f, "{}", reason),
            JobError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for JobError {}

/// Durable per-attempt record of conversions.
///
/// Every mutator is an independent field update returning the updated job.
pub trait JobLedger: Send + Sync {
    /// Create a pending job.
    fn create(
        &self,
        source_name: &str,
        source_format: &str,
        target_format: &str,
    ) -> Result<Job, JobError>;

    /// Start a new attempt on an existing job: back to pending, error and
    /// duration cleared.
    fn begin_attempt(&self, id: i64) -> Result<Job, JobError>;

    fn mark_original_stored(&self, id: i64, path: &str, mime_type: &str) -> Result<Job, JobError>;

    /// Record the artifact location; path and mime are always written together.
    fn mark_artifact_stored(
        &self,
        id: i64,
        path: &str,
        mime_type: &str,
        stored_at: DateTime<Utc>,
    ) -> Result<Job, JobError>;

    /// `pending -> failed`. Repeating on an already failed job overwrites the
    /// error; a successful job is `InvalidState`.
    fn mark_failed(&self, id: i64, error: &str) -> Result<Job, JobError>;

    /// `pending -> success`. Repeating on an already successful job updates
    /// the duration; a failed job is `InvalidState`.
    fn mark_success(&self, id: i64, duration_ms: u64) -> Result<Job, JobError>;

    /// Append a side note (`"; {note}"`) to the error text without touching
    /// the status.
    fn append_error(&self, id: i64, note: &str) -> Result<Job, JobError>;

    /// Get a job by ID.
    fn get(&self, id: i64) -> Result<Option<Job>, JobError>;

    /// Most recent jobs first.
    fn list_recent(&self, limit: usize) -> Result<Vec<Job>, JobError>;

    /// Issue a new share token, replacing any previous one.
    ///
    /// Fails with `InvalidState` when the job has no stored artifact.
    fn issue_share_token(&self, id: i64, ttl: Duration) -> Result<ShareGrant, JobError>;

    /// Get a job or `NotFound`.
    fn require(&self, id: i64) -> Result<Job, JobError> {
        self.get(id)?.ok_or(JobError::NotFound(id))
    }

    /// True iff `token` is the job's current token and `now` precedes expiry.
    fn validate_share_token(
        &self,
        id: i64,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, JobError> {
        Ok(self.require(id)?.validate_share_token(token, now))
    }
}

/// Checks artifact access for `job`.
///
/// Jobs without a share token are open. Otherwise the presented token must
/// match and be unexpired.
pub fn authorize_artifact_access(
    job: &Job,
    token: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), JobError> {
    if !job.requires_share_token() {
        return Ok(());
    }
    let Some(token) = token else {
        return Err(JobError::AuthFailure("Token required or invalid".to_string()));
    };
    if job.share_token.as_deref() != Some(token) {
        return Err(JobError::AuthFailure("Token required or invalid".to_string()));
    }
    if !job.validate_share_token(token, now) {
        return Err(JobError::AuthFailure("Share token expired".to_string()));
    }
    Ok(())
}
