pub mod config;
pub mod converter;
pub mod executor;
pub mod job;
pub mod metrics;
pub mod registry;
pub mod service;
pub mod storage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    StorageBackend,
};
pub use converter::{builtin_registry, AdapterError, AdapterRef, Converted, DEFAULT_MIME_TYPE};
pub use executor::{ChainExecutor, ExecutionError, ExecutionOutcome};
pub use job::{Job, JobError, JobLedger, JobStatus, ShareGrant, SqliteJobLedger};
pub use registry::{
    Chain, ConversionRegistry, FormatDescriptor, ReachableDescriptor, RegistryBuilder,
    RegistryError,
};
pub use service::{
    ArtifactDelivery, ConversionResult, ConversionService, ConvertError, ConvertRequest,
    ErrorKind, ServiceSettings, ShareLink,
};
pub use storage::{
    build_store, ArtifactStore, BlobKind, LocalArtifactStore, RetentionPolicy, RetentionSweeper,
    S3ArtifactStore, StorageError,
};
