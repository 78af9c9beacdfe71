//! Persistence for uploaded originals and conversion artifacts.
//!
//! Two interchangeable backends share the [`ArtifactStore`] contract: the
//! local filesystem and S3-compatible object storage.

mod local;
mod s3;
mod sweeper;
mod types;

use std::sync::Arc;

pub use local::LocalArtifactStore;
pub use s3::{parse_s3_uri, S3ArtifactStore};
pub use sweeper::{RetentionPolicy, RetentionSweeper, SweepReport};
pub use types::{retention_days, ArtifactStore, BlobKind, StorageError, StoreToggles, StoredBlob};

use crate::config::{StorageBackend, StorageConfig};

/// Build the backend selected in `config`.
pub async fn build_store(config: &StorageConfig) -> Result<Arc<dyn ArtifactStore>, StorageError> {
    let toggles = StoreToggles {
        artifacts_enabled: config.artifacts_enabled,
        originals_enabled: config.originals_enabled,
    };

    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalArtifactStore::from_config(config))),
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                StorageError::Configuration("storage.s3 section is required for the s3 backend".to_string())
            })?;
            Ok(Arc::new(S3ArtifactStore::connect(s3, toggles).await?))
        }
    }
}
