//! Job history, reconversion, sharing and artifact download.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use omniconvert_core::{ArtifactDelivery, ErrorKind, Job, JobStatus};

use super::conversions::attachment_headers;
use super::error::ApiError;
use crate::metrics::ARTIFACT_DELIVERIES;
use crate::state::AppState;

/// Default number of jobs returned by history
const DEFAULT_LIMIT: usize = 25;

/// Maximum number of jobs returned by history
const MAX_LIMIT: usize = 500;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ShareParams {
    /// Token lifetime in seconds; the configured default when absent
    pub ttl_s: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactParams {
    pub token: Option<String>,
}

/// Public view of a job. Storage references and the share token stay private.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: i64,
    pub source_name: String,
    pub source_format: String,
    pub target_format: String,
    pub status: JobStatus,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub created_at: String,
    pub artifact_stored: bool,
    pub artifact_mime_type: Option<String>,
    pub stored_at: Option<String>,
    pub original_stored: bool,
    pub original_mime_type: Option<String>,
    pub share_token_expires_at: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            artifact_stored: job.artifact_stored(),
            original_stored: job.original_stored(),
            id: job.id,
            source_name: job.source_name,
            source_format: job.source_format,
            target_format: job.target_format,
            status: job.status,
            duration_ms: job.duration_ms,
            error: job.error,
            created_at: job.created_at.to_rfc3339(),
            artifact_mime_type: job.artifact_mime_type,
            stored_at: job.stored_at.map(|t| t.to_rfc3339()),
            original_mime_type: job.original_mime_type,
            share_token_expires_at: job.share_token_expires_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReconvertResponse {
    pub job_id: i64,
    /// Storage reference of the refreshed artifact, if it was persisted
    pub artifact: Option<String>,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub job_id: i64,
    pub share_url: String,
    pub expires_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/history
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let jobs = state.service().history(limit)?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.service().job(id)?;
    Ok(Json(JobResponse::from(job)))
}

/// POST /api/jobs/{id}/reconvert
pub async fn reconvert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ReconvertResponse>, ApiError> {
    let result = state.service().reconvert(id).await?;
    Ok(Json(ReconvertResponse {
        job_id: result.job.id,
        artifact: result.job.artifact_path,
        status: result.job.status,
    }))
}

/// POST /api/jobs/{id}/share
pub async fn share(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ShareParams>,
) -> Result<Json<ShareResponse>, ApiError> {
    let ttl = params.ttl_s.map(Duration::from_secs);
    let link = state.service().share(id, ttl)?;
    Ok(Json(ShareResponse {
        job_id: link.grant.job_id,
        share_url: link.share_url,
        expires_at: link.grant.expires_at.to_rfc3339(),
    }))
}

/// GET /api/jobs/{id}/artifact
///
/// Redirects to a presigned URL for object storage, otherwise streams the
/// stored bytes. A job with a share token requires `?token=`.
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ArtifactParams>,
) -> Result<Response, ApiError> {
    let delivery = match state
        .service()
        .fetch_artifact(id, params.token.as_deref())
        .await
    {
        Ok(delivery) => delivery,
        Err(e) => {
            if e.kind() == ErrorKind::AuthFailure {
                ARTIFACT_DELIVERIES.with_label_values(&["denied"]).inc();
            }
            return Err(e.into());
        }
    };

    match delivery {
        ArtifactDelivery::Redirect(url) => {
            ARTIFACT_DELIVERIES.with_label_values(&["redirect"]).inc();
            Ok(Redirect::temporary(&url).into_response())
        }
        ArtifactDelivery::Content {
            bytes,
            mime_type,
            filename,
        } => {
            ARTIFACT_DELIVERIES.with_label_values(&["content"]).inc();
            Ok((attachment_headers(&mime_type, &filename), bytes).into_response())
        }
    }
}
