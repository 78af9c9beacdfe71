use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `OMNICONVERT_UPLOADS__MAX_SIZE_MB=50`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("OMNICONVERT_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[server]
port = 9000

[uploads]
max_size_mb = 10
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.uploads.max_size_mb, 10);
    }

    #[test]
    fn test_load_config_from_str_invalid_backend() {
        let toml = r#"
[storage]
backend = "ftp"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
host = "127.0.0.1"
port = 3000

[sharing]
default_ttl_secs = 60
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.sharing.default_ttl_secs, 60);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.artifacts_retention_days, 7);
        assert_eq!(config.uploads.max_size_mb, 25);
        assert_eq!(config.converters.max_fallback_attempts, 1);
        assert!(config.storage.s3.is_none());
    }

    #[test]
    fn test_load_s3_section() {
        let toml = r#"
[storage]
backend = "s3"
originals_enabled = false

[storage.s3]
bucket = "conversions"
region = "eu-west-1"
endpoint = "http://localhost:9000"
force_path_style = true
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert!(!config.storage.originals_enabled);
        let s3 = config.storage.s3.unwrap();
        assert_eq!(s3.bucket, "conversions");
        assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(s3.force_path_style);
        assert!(s3.access_key.is_none());
    }
}
