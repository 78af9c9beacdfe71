//! Artifact store trait and shared types.

use std::fmt;
use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Which family of blobs an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    /// Uploaded source file.
    Original,
    /// Produced conversion result.
    Artifact,
}

impl BlobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobKind::Original => "original",
            BlobKind::Artifact => "artifact",
        }
    }

    /// Key prefix used by object storage.
    pub fn prefix(&self) -> &'static str {
        match self {
            BlobKind::Original => "originals",
            BlobKind::Artifact => "artifacts",
        }
    }
}

impl fmt::Display for BlobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from artifact storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Stored blob not found: {0}")]
    NotFound(String),

    #[error("{0} storage is disabled")]
    Disabled(BlobKind),

    #[error("Storage misconfigured: {0}")]
    Configuration(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Object storage error: {0}")]
    Remote(String),
}

/// Reference to a freshly written blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Filesystem path or `s3://bucket/key` URI.
    pub reference: String,
    pub stored_at: DateTime<Utc>,
}

/// Which kinds a store accepts writes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreToggles {
    pub artifacts_enabled: bool,
    pub originals_enabled: bool,
}

impl StoreToggles {
    pub fn enabled(&self, kind: BlobKind) -> bool {
        match kind {
            BlobKind::Original => self.originals_enabled,
            BlobKind::Artifact => self.artifacts_enabled,
        }
    }

    pub(crate) fn check(&self, kind: BlobKind) -> Result<(), StorageError> {
        if self.enabled(kind) {
            Ok(())
        } else {
            Err(StorageError::Disabled(kind))
        }
    }
}

impl Default for StoreToggles {
    fn default() -> Self {
        Self {
            artifacts_enabled: true,
            originals_enabled: true,
        }
    }
}

/// Persistence for uploaded originals and produced artifacts.
///
/// Blobs are keyed by job id plus a random suffix, so repeated saves for one
/// job never overwrite each other.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Backend name for logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Write a blob of the given kind.
    async fn save(
        &self,
        kind: BlobKind,
        job_id: i64,
        filename: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StoredBlob, StorageError>;

    async fn save_original(
        &self,
        job_id: i64,
        filename: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        self.save(BlobKind::Original, job_id, filename, content, mime_type)
            .await
    }

    async fn save_artifact(
        &self,
        job_id: i64,
        filename: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        self.save(BlobKind::Artifact, job_id, filename, content, mime_type)
            .await
    }

    /// Read a blob back. `NotFound` when it no longer exists.
    async fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError>;

    /// Time-limited direct download URL, or `None` when the backend has no
    /// such concept.
    async fn presign(&self, reference: &str, ttl: Duration)
        -> Result<Option<String>, StorageError>;

    /// Delete blobs of `kind` last modified before `now - retention`.
    ///
    /// Per-blob failures are logged and skipped; the count covers successful
    /// deletions only.
    async fn sweep(&self, kind: BlobKind, retention: Duration) -> Result<usize, StorageError>;
}

/// Final path component of an uploaded name, so clients cannot steer writes
/// outside the storage root.
pub(crate) fn safe_filename(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("upload")
        .to_string()
}

pub(crate) fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Retention horizon in days as a duration.
pub fn retention_days(days: u32) -> Duration {
    Duration::from_secs(u64::from(days) * 24 * 60 * 60)
}
