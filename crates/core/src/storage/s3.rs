//! S3-compatible object storage backend.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::Utc;
use tracing::{debug, warn};

use super::local::read_local;
use super::types::{random_suffix, safe_filename};
use super::{ArtifactStore, BlobKind, StorageError, StoreToggles, StoredBlob};
use crate::config::S3Config;

const URI_SCHEME: &str = "s3://";

/// Stores blobs under `{kind}s/{job_id}/{suffix}/{filename}` in one bucket.
///
/// References are `s3://{bucket}/{key}` URIs.
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    toggles: StoreToggles,
}

impl S3ArtifactStore {
    /// Build a client from the ambient AWS configuration, overridden by any
    /// region, endpoint or static credentials in `config`.
    pub async fn connect(config: &S3Config, toggles: StoreToggles) -> Result<Self, StorageError> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::Configuration(
                "S3 bucket must be set".to_string(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "omniconvert-config",
            ));
        }
        let shared_config = loader.load().await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }

        Ok(Self::with_client(
            Client::from_conf(s3_builder.build()),
            config.bucket.clone(),
            toggles,
        ))
    }

    pub fn with_client(client: Client, bucket: String, toggles: StoreToggles) -> Self {
        Self {
            client,
            bucket,
            toggles,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn object_key(kind: BlobKind, job_id: i64, filename: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        kind.prefix(),
        job_id,
        random_suffix(),
        safe_filename(filename)
    )
}

/// Split `s3://bucket/key` into its parts.
pub fn parse_s3_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix(URI_SCHEME)?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

fn remote_error<E: std::error::Error>(err: E) -> StorageError {
    StorageError::Remote(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn save(
        &self,
        kind: BlobKind,
        job_id: i64,
        filename: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StoredBlob, StorageError> {
        self.toggles.check(kind)?;

        let key = object_key(kind, job_id, filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(content.to_vec()))
            .content_type(mime_type)
            .send()
            .await
            .map_err(remote_error)?;

        debug!(job_id, kind = %kind, bucket = %self.bucket, key = %key, "Uploaded blob");

        Ok(StoredBlob {
            reference: format!("{}{}/{}", URI_SCHEME, self.bucket, key),
            stored_at: Utc::now(),
        })
    }

    async fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        // Jobs stored before switching to S3 still point at local files
        if !reference.starts_with(URI_SCHEME) {
            return read_local(reference).await;
        }

        let (bucket, key) = parse_s3_uri(reference)
            .ok_or_else(|| StorageError::NotFound(reference.to_string()))?;

        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    return Err(StorageError::NotFound(reference.to_string()));
                }
                return Err(remote_error(err));
            }
        };

        let data = output.body.collect().await.map_err(remote_error)?;
        Ok(data.into_bytes().to_vec())
    }

    async fn presign(
        &self,
        reference: &str,
        ttl: Duration,
    ) -> Result<Option<String>, StorageError> {
        let Some((bucket, key)) = parse_s3_uri(reference) else {
            return Ok(None);
        };

        let presigning = PresigningConfig::expires_in(ttl).map_err(remote_error)?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(remote_error)?;

        Ok(Some(request.uri().to_string()))
    }

    async fn sweep(&self, kind: BlobKind, retention: Duration) -> Result<usize, StorageError> {
        let retention_secs = i64::try_from(retention.as_secs()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp().saturating_sub(retention_secs);
        let prefix = format!("{}/", kind.prefix());

        let mut deleted = 0;
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(remote_error)?;

            for object in page.contents() {
                let (Some(key), Some(modified)) = (object.key(), object.last_modified()) else {
                    continue;
                };
                if modified.secs() >= cutoff {
                    continue;
                }

                match self
                    .client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                {
                    Ok(_) => deleted += 1,
                    Err(e) => warn!(
                        bucket = %self.bucket,
                        key,
                        error = %DisplayErrorContext(&e),
                        "Failed to delete expired object"
                    ),
                }
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(deleted)
    }
}
