//! Local filesystem artifact store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::types::{random_suffix, safe_filename};
use super::{ArtifactStore, BlobKind, StorageError, StoreToggles, StoredBlob};
use crate::config::StorageConfig;

/// Stores blobs as `{dir}/{job_id}_{suffix}_{filename}`.
pub struct LocalArtifactStore {
    artifacts_dir: PathBuf,
    originals_dir: PathBuf,
    toggles: StoreToggles,
}

impl LocalArtifactStore {
    pub fn new(artifacts_dir: PathBuf, originals_dir: PathBuf, toggles: StoreToggles) -> Self {
        Self {
            artifacts_dir,
            originals_dir,
            toggles,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.artifacts_dir.clone(),
            config.originals_dir.clone(),
            StoreToggles {
                artifacts_enabled: config.artifacts_enabled,
                originals_enabled: config.originals_enabled,
            },
        )
    }

    fn dir(&self, kind: BlobKind) -> &Path {
        match kind {
            BlobKind::Original => &self.originals_dir,
            BlobKind::Artifact => &self.artifacts_dir,
        }
    }
}

pub(crate) async fn read_local(reference: &str) -> Result<Vec<u8>, StorageError> {
    match tokio::fs::read(reference).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(StorageError::NotFound(reference.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn save(
        &self,
        kind: BlobKind,
        job_id: i64,
        filename: &str,
        content: &[u8],
        _mime_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        self.toggles.check(kind)?;

        let dir = self.dir(kind);
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!(
            "{}_{}_{}",
            job_id,
            random_suffix(),
            safe_filename(filename)
        ));
        tokio::fs::write(&path, content).await?;

        debug!(job_id, kind = %kind, path = %path.display(), "Stored blob");

        Ok(StoredBlob {
            reference: path.to_string_lossy().into_owned(),
            stored_at: Utc::now(),
        })
    }

    async fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        if reference.starts_with("s3://") {
            return Err(StorageError::Configuration(format!(
                "remote reference {} cannot be read by the local backend",
                reference
            )));
        }

        read_local(reference).await
    }

    async fn presign(
        &self,
        _reference: &str,
        _ttl: Duration,
    ) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    async fn sweep(&self, kind: BlobKind, retention: Duration) -> Result<usize, StorageError> {
        let dir = self.dir(kind);
        let cutoff = SystemTime::now()
            .checked_sub(retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut deleted = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let modified = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta.modified(),
                Ok(_) => continue,
                Err(e) => Err(e),
            };

            let modified = match modified {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat blob during sweep");
                    continue;
                }
            };

            if modified >= cutoff {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete expired blob"),
            }
        }

        Ok(deleted)
    }
}
