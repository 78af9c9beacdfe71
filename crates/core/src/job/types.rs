//! Job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the latest conversion attempt on a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "success" => Some(JobStatus::Success),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// Durable record of a conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Monotonic identifier assigned on creation.
    pub id: i64,
    pub source_name: String,
    pub source_format: String,
    pub target_format: String,
    pub status: JobStatus,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Path or `s3://` URI of the stored upload.
    pub original_path: Option<String>,
    pub original_mime_type: Option<String>,
    /// Path or `s3://` URI of the stored result.
    pub artifact_path: Option<String>,
    pub artifact_mime_type: Option<String>,
    pub stored_at: Option<DateTime<Utc>>,
    pub share_token: Option<String>,
    pub share_token_expires_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn artifact_stored(&self) -> bool {
        self.artifact_path.is_some()
    }

    pub fn original_stored(&self) -> bool {
        self.original_path.is_some()
    }

    /// True iff `token` is this job's current token and `now` is before its
    /// expiry.
    pub fn validate_share_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.share_token, self.share_token_expires_at) {
            (Some(current), Some(expires_at)) => current == token && now < expires_at,
            _ => false,
        }
    }

    /// Whether fetching the artifact needs a token at all.
    pub fn requires_share_token(&self) -> bool {
        self.share_token.is_some()
    }
}

/// A freshly issued share token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareGrant {
    pub job_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
