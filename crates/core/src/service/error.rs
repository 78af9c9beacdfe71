use thiserror::Error;

use crate::job::JobError;
use crate::registry::RegistryError;
use crate::storage::{BlobKind, StorageError};

/// Coarse error classes the HTTP layer maps onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AdapterFailure,
    InvalidState,
    AuthFailure,
    ConfigurationError,
    InvalidRequest,
    PayloadTooLarge,
    Unsupported,
    Internal,
}

/// Errors surfaced by [`ConversionService`](super::ConversionService).
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Source file must have an extension")]
    MissingExtension,

    #[error("File limit is {limit_mb} MB")]
    PayloadTooLarge { limit_mb: u64 },

    #[error("Conversion path not available yet")]
    Unsupported {
        job_id: Option<i64>,
        reason: RegistryError,
    },

    /// Adapter message passed through verbatim.
    #[error("{message}")]
    AdapterFailed { job_id: i64, message: String },

    #[error("Job not found")]
    JobNotFound(i64),

    #[error("No original stored for this job")]
    NoOriginal(i64),

    #[error("No stored artifact for this job")]
    NoArtifact(i64),

    #[error("Stored {0} missing")]
    BlobMissing(BlobKind),

    #[error("{0}")]
    Auth(String),

    #[error(transparent)]
    Job(JobError),

    #[error(transparent)]
    Storage(StorageError),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::MissingExtension => ErrorKind::InvalidRequest,
            ConvertError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            ConvertError::Unsupported { .. } => ErrorKind::Unsupported,
            ConvertError::AdapterFailed { .. } => ErrorKind::AdapterFailure,
            ConvertError::JobNotFound(_)
            | ConvertError::NoArtifact(_)
            | ConvertError::BlobMissing(_) => ErrorKind::NotFound,
            ConvertError::NoOriginal(_) => ErrorKind::InvalidState,
            ConvertError::Auth(_) => ErrorKind::AuthFailure,
            ConvertError::Job(e) => match e {
                JobError::NotFound(_) => ErrorKind::NotFound,
                JobError::InvalidState { .. } => ErrorKind::InvalidState,
                JobError::AuthFailure(_) => ErrorKind::AuthFailure,
                JobError::Database(_) => ErrorKind::Internal,
            },
            ConvertError::Storage(e) => match e {
                StorageError::NotFound(_) => ErrorKind::NotFound,
                StorageError::Disabled(_) | StorageError::Configuration(_) => {
                    ErrorKind::ConfigurationError
                }
                StorageError::Io(_) | StorageError::Remote(_) => ErrorKind::Internal,
            },
        }
    }

    /// Job the failure was recorded against, if one was created.
    pub fn job_id(&self) -> Option<i64> {
        match self {
            ConvertError::Unsupported { job_id, .. } => *job_id,
            ConvertError::AdapterFailed { job_id, .. }
            | ConvertError::JobNotFound(job_id)
            | ConvertError::NoOriginal(job_id)
            | ConvertError::NoArtifact(job_id) => Some(*job_id),
            _ => None,
        }
    }
}

impl From<JobError> for ConvertError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::NotFound(id) => ConvertError::JobNotFound(id),
            JobError::AuthFailure(reason) => ConvertError::Auth(reason),
            other => ConvertError::Job(other),
        }
    }
}

impl From<StorageError> for ConvertError {
    fn from(e: StorageError) -> Self {
        ConvertError::Storage(e)
    }
}
