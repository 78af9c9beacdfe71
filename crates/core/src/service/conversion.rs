//! Request-level orchestration: plan, execute, record, persist.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::naming::{detect_source_format, output_filename, upload_name};
use super::ConvertError;
use crate::config::Config;
use crate::converter::DEFAULT_MIME_TYPE;
use crate::executor::{ChainExecutor, ExecutionError};
use crate::job::{authorize_artifact_access, Job, JobLedger, ShareGrant};
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION, PRESIGN_TOTAL, STORAGE_SAVES};
use crate::registry::{
    normalize_label, Chain, ConversionRegistry, FormatDescriptor, ReachableDescriptor,
};
use crate::storage::{parse_s3_uri, ArtifactStore, BlobKind, StorageError};

/// Service-level knobs derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub max_upload_mb: u64,
    pub store_originals: bool,
    pub store_artifacts: bool,
    pub default_share_ttl: Duration,
    pub presign_ttl: Duration,
    pub max_fallback_attempts: u32,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_mb: config.uploads.max_size_mb,
            store_originals: config.storage.originals_enabled,
            store_artifacts: config.storage.artifacts_enabled,
            default_share_ttl: Duration::from_secs(config.sharing.default_ttl_secs),
            presign_ttl: Duration::from_secs(config.sharing.presign_ttl_secs),
            max_fallback_attempts: config.converters.max_fallback_attempts,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// An uploaded file awaiting conversion.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub filename: String,
    pub target_format: String,
    pub content: Vec<u8>,
    /// Client-declared content type of the upload.
    pub content_type: Option<String>,
}

/// Result of a successful conversion attempt.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Job state after the attempt, including any side-storage notes.
    pub job: Job,
    pub content: Vec<u8>,
    pub mime_type: String,
    /// Suggested download name, `{stem}.{target}`.
    pub filename: String,
    pub chain: Chain,
    pub fallbacks: u32,
}

/// A share link for a job's artifact.
#[derive(Debug, Clone)]
pub struct ShareLink {
    pub grant: ShareGrant,
    /// Relative URL embedding the token.
    pub share_url: String,
}

/// How an artifact is handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactDelivery {
    /// Temporary direct URL from object storage.
    Redirect(String),
    Content {
        bytes: Vec<u8>,
        mime_type: String,
        filename: String,
    },
}

/// Conversion front door shared by every request handler.
pub struct ConversionService {
    executor: ChainExecutor,
    ledger: Arc<dyn JobLedger>,
    store: Arc<dyn ArtifactStore>,
    settings: ServiceSettings,
}

impl ConversionService {
    pub fn new(
        registry: Arc<ConversionRegistry>,
        ledger: Arc<dyn JobLedger>,
        store: Arc<dyn ArtifactStore>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            executor: ChainExecutor::new(registry, settings.max_fallback_attempts),
            ledger,
            store,
            settings,
        }
    }

    pub fn registry(&self) -> &ConversionRegistry {
        self.executor.registry()
    }

    pub fn ledger(&self) -> &Arc<dyn JobLedger> {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn formats(&self) -> Vec<FormatDescriptor> {
        self.registry().describe()
    }

    pub fn expanded_formats(&self) -> Vec<ReachableDescriptor> {
        self.registry().describe_reachable()
    }

    /// Convert an upload, recording the job and persisting both blobs.
    pub async fn convert(&self, request: ConvertRequest) -> Result<ConversionResult, ConvertError> {
        let source_name = upload_name(&request.filename);
        let source_format = detect_source_format(&source_name, self.registry())?;
        let target_format = normalize_label(&request.target_format);

        if request.content.len() as u64 > self.settings.max_upload_bytes() {
            return Err(ConvertError::PayloadTooLarge {
                limit_mb: self.settings.max_upload_mb,
            });
        }

        let job = self
            .ledger
            .create(&source_name, &source_format, &target_format)?;
        info!(
            job_id = job.id,
            source = %source_format,
            target = %target_format,
            size = request.content.len(),
            "Conversion requested"
        );

        if self.settings.store_originals {
            let mime_type = request
                .content_type
                .as_deref()
                .unwrap_or(DEFAULT_MIME_TYPE);
            self.store_original(&job, &request.content, mime_type).await?;
        }

        self.run_attempt(&job, request.content).await
    }

    /// Re-run a job from its stored original, refreshing the artifact.
    pub async fn reconvert(&self, job_id: i64) -> Result<ConversionResult, ConvertError> {
        let job = self.ledger.require(job_id)?;
        let Some(original_path) = job.original_path.as_deref() else {
            return Err(ConvertError::NoOriginal(job_id));
        };

        let original = match self.store.load(original_path).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                return Err(ConvertError::BlobMissing(BlobKind::Original))
            }
            Err(e) => return Err(e.into()),
        };

        let job = self.ledger.begin_attempt(job_id)?;
        info!(job_id, source = %job.source_format, target = %job.target_format, "Reconversion requested");

        self.run_attempt(&job, original).await
    }

    /// Issue a share token; `ttl` defaults to the configured lifetime.
    pub fn share(&self, job_id: i64, ttl: Option<Duration>) -> Result<ShareLink, ConvertError> {
        let ttl = ttl.unwrap_or(self.settings.default_share_ttl);
        let grant = self.ledger.issue_share_token(job_id, ttl)?;
        info!(job_id, expires_at = %grant.expires_at, "Share token issued");

        Ok(ShareLink {
            share_url: format!("/api/jobs/{}/artifact?token={}", job_id, grant.token),
            grant,
        })
    }

    /// Resolve an artifact download, enforcing the job's share token.
    pub async fn fetch_artifact(
        &self,
        job_id: i64,
        token: Option<&str>,
    ) -> Result<ArtifactDelivery, ConvertError> {
        let job = self.ledger.require(job_id)?;
        let Some(reference) = job.artifact_path.as_deref() else {
            return Err(ConvertError::NoArtifact(job_id));
        };

        authorize_artifact_access(&job, token, Utc::now())?;

        if parse_s3_uri(reference).is_some() {
            match self.store.presign(reference, self.settings.presign_ttl).await {
                Ok(Some(url)) => {
                    PRESIGN_TOTAL.with_label_values(&["issued"]).inc();
                    return Ok(ArtifactDelivery::Redirect(url));
                }
                Ok(None) => {
                    PRESIGN_TOTAL.with_label_values(&["unsupported"]).inc();
                }
                Err(e) => {
                    PRESIGN_TOTAL.with_label_values(&["failed"]).inc();
                    warn!(job_id, error = %e, "Presign failed, streaming artifact instead");
                }
            }
        }

        let bytes = match self.store.load(reference).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                return Err(ConvertError::BlobMissing(BlobKind::Artifact))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ArtifactDelivery::Content {
            bytes,
            mime_type: job
                .artifact_mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            filename: output_filename(&job.source_name, &job.source_format, &job.target_format),
        })
    }

    pub fn history(&self, limit: usize) -> Result<Vec<Job>, ConvertError> {
        Ok(self.ledger.list_recent(limit)?)
    }

    pub fn job(&self, job_id: i64) -> Result<Job, ConvertError> {
        Ok(self.ledger.require(job_id)?)
    }

    async fn store_original(
        &self,
        job: &Job,
        content: &[u8],
        mime_type: &str,
    ) -> Result<(), ConvertError> {
        match self
            .store
            .save_original(job.id, &job.source_name, content, mime_type)
            .await
        {
            Ok(blob) => {
                STORAGE_SAVES.with_label_values(&["original", "success"]).inc();
                self.ledger
                    .mark_original_stored(job.id, &blob.reference, mime_type)?;
            }
            Err(e) => {
                STORAGE_SAVES.with_label_values(&["original", "failed"]).inc();
                warn!(job_id = job.id, error = %e, "Failed to store original");
                self.ledger
                    .append_error(job.id, &format!("original save failed: {}", e))?;
            }
        }
        Ok(())
    }

    async fn store_artifact(
        &self,
        job_id: i64,
        filename: &str,
        content: &[u8],
        mime_type: &str,
    ) -> Result<Job, ConvertError> {
        match self
            .store
            .save_artifact(job_id, filename, content, mime_type)
            .await
        {
            Ok(blob) => {
                STORAGE_SAVES.with_label_values(&["artifact", "success"]).inc();
                Ok(self.ledger.mark_artifact_stored(
                    job_id,
                    &blob.reference,
                    mime_type,
                    blob.stored_at,
                )?)
            }
            Err(e) => {
                STORAGE_SAVES.with_label_values(&["artifact", "failed"]).inc();
                warn!(job_id, error = %e, "Failed to store artifact");
                Ok(self
                    .ledger
                    .append_error(job_id, &format!("artifact save failed: {}", e))?)
            }
        }
    }

    /// One planned-and-executed attempt on a pending job. Every failure is
    /// written to the ledger before it is returned.
    async fn run_attempt(&self, job: &Job, content: Vec<u8>) -> Result<ConversionResult, ConvertError> {
        let chain = match self.executor.plan(&job.source_format, &job.target_format) {
            Ok(chain) => chain,
            Err(e) => return Err(self.record_failure(job.id, e)),
        };

        let outcome = match self
            .executor
            .execute(content, &job.source_format, &job.target_format, chain)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.record_failure(job.id, e)),
        };

        let mut updated = self.ledger.mark_success(job.id, outcome.duration_ms)?;
        CONVERSIONS_TOTAL.with_label_values(&["success"]).inc();
        CONVERSION_DURATION
            .with_label_values(&["success"])
            .observe(outcome.duration_ms as f64 / 1000.0);

        let filename = output_filename(&job.source_name, &job.source_format, &job.target_format);
        if self.settings.store_artifacts {
            updated = self
                .store_artifact(
                    job.id,
                    &filename,
                    &outcome.output.content,
                    &outcome.output.mime_type,
                )
                .await?;
        }

        info!(
            job_id = job.id,
            chain_len = outcome.chain.len(),
            fallbacks = outcome.fallbacks,
            duration_ms = outcome.duration_ms,
            "Conversion succeeded"
        );

        Ok(ConversionResult {
            job: updated,
            content: outcome.output.content,
            mime_type: outcome.output.mime_type,
            filename,
            chain: outcome.chain,
            fallbacks: outcome.fallbacks,
        })
    }

    fn record_failure(&self, job_id: i64, error: ExecutionError) -> ConvertError {
        let (message, result, converted) = match error {
            ExecutionError::NoRoute(reason) => (
                "Conversion not supported yet".to_string(),
                "unsupported",
                ConvertError::Unsupported {
                    job_id: Some(job_id),
                    reason,
                },
            ),
            ExecutionError::AdapterFailed { message, .. } => (
                message.clone(),
                "failed",
                ConvertError::AdapterFailed { job_id, message },
            ),
        };

        CONVERSIONS_TOTAL.with_label_values(&[result]).inc();
        warn!(job_id, error = %message, "Conversion failed");

        if let Err(e) = self.ledger.mark_failed(job_id, &message) {
            warn!(job_id, error = %e, "Failed to record conversion failure");
        }
        converted
    }
}
