use super::{types::Config, types::StorageBackend, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upload ceiling is positive
/// - The s3 backend has a bucket configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.uploads.max_size_mb == 0 {
        return Err(ConfigError::ValidationError(
            "uploads.max_size_mb must be greater than 0".to_string(),
        ));
    }

    if config.storage.backend == StorageBackend::S3 {
        match &config.storage.s3 {
            Some(s3) if !s3.bucket.trim().is_empty() => {}
            Some(_) => {
                return Err(ConfigError::ValidationError(
                    "storage.s3.bucket must be set".to_string(),
                ))
            }
            None => {
                return Err(ConfigError::ValidationError(
                    "storage.backend is \"s3\" but [storage.s3] is missing".to_string(),
                ))
            }
        }
    }

    if config.storage.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "storage.sweep_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
