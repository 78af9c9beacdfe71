use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sharing: SharingConfig,
    #[serde(default)]
    pub converters: ConvertersConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by the CORS layer. `"*"` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/conversions.db")
}

/// Upload limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Maximum accepted upload size in megabytes.
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl UploadConfig {
    pub fn max_bytes(&self) -> u64 {
        self.max_size_mb * 1024 * 1024
    }
}

fn default_max_size_mb() -> u64 {
    25
}

/// Available storage backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

/// Original/artifact persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_true")]
    pub artifacts_enabled: bool,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_retention_days")]
    pub artifacts_retention_days: u32,
    #[serde(default = "default_true")]
    pub originals_enabled: bool,
    #[serde(default = "default_originals_dir")]
    pub originals_dir: PathBuf,
    #[serde(default = "default_retention_days")]
    pub originals_retention_days: u32,
    /// Interval between retention sweeps in seconds (default: daily).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// S3 settings (required when backend = "s3")
    #[serde(default)]
    pub s3: Option<S3Config>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            artifacts_enabled: true,
            artifacts_dir: default_artifacts_dir(),
            artifacts_retention_days: default_retention_days(),
            originals_enabled: true,
            originals_dir: default_originals_dir(),
            originals_retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval(),
            s3: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("data/artifacts")
}

fn default_originals_dir() -> PathBuf {
    PathBuf::from("data/originals")
}

fn default_retention_days() -> u32 {
    7
}

fn default_sweep_interval() -> u64 {
    24 * 60 * 60
}

/// S3-compatible object storage configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL (for S3-compatible stores such as MinIO).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

/// Share token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SharingConfig {
    /// Default share token lifetime in seconds.
    #[serde(default = "default_share_ttl")]
    pub default_ttl_secs: u64,
    /// Lifetime of presigned object storage URLs in seconds.
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_secs: u64,
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_share_ttl(),
            presign_ttl_secs: default_presign_ttl(),
        }
    }
}

fn default_share_ttl() -> u64 {
    86_400
}

fn default_presign_ttl() -> u64 {
    3_600
}

/// Converter tooling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConvertersConfig {
    /// Path to the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Path to the LibreOffice binary (autodetected when unset).
    #[serde(default)]
    pub soffice_path: Option<PathBuf>,
    /// Path to rsvg-convert for SVG rendering (autodetected when unset).
    #[serde(default)]
    pub rsvg_path: Option<PathBuf>,
    /// How many alternate chains to try after the first chain fails.
    #[serde(default = "default_max_fallback_attempts")]
    pub max_fallback_attempts: u32,
}

impl Default for ConvertersConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            soffice_path: None,
            rsvg_path: None,
            max_fallback_attempts: default_max_fallback_attempts(),
        }
    }
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_max_fallback_attempts() -> u32 {
    1
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub storage: SanitizedStorageConfig,
    pub sharing: SharingConfig,
    pub converters: ConvertersConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStorageConfig {
    pub backend: String,
    pub artifacts_enabled: bool,
    pub artifacts_retention_days: u32,
    pub originals_enabled: bool,
    pub originals_retention_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<SanitizedS3Config>,
}

/// Sanitized S3 config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedS3Config {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub credentials_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            uploads: config.uploads.clone(),
            storage: SanitizedStorageConfig {
                backend: match config.storage.backend {
                    StorageBackend::Local => "local".to_string(),
                    StorageBackend::S3 => "s3".to_string(),
                },
                artifacts_enabled: config.storage.artifacts_enabled,
                artifacts_retention_days: config.storage.artifacts_retention_days,
                originals_enabled: config.storage.originals_enabled,
                originals_retention_days: config.storage.originals_retention_days,
                s3: config.storage.s3.as_ref().map(|s3| SanitizedS3Config {
                    bucket: s3.bucket.clone(),
                    region: s3.region.clone(),
                    endpoint: s3.endpoint.clone(),
                    credentials_configured: s3.access_key.is_some() && s3.secret_key.is_some(),
                }),
            },
            sharing: config.sharing.clone(),
            converters: config.converters.clone(),
        }
    }
}
