//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the full router around
//! an in-memory job ledger, local artifact storage in a temp directory and
//! a caller-chosen conversion registry.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use omniconvert_core::{
    builtin_registry, storage::StoreToggles, Config, ConversionRegistry, ConversionService,
    LocalArtifactStore, ServiceSettings, SqliteJobLedger,
};
use omniconvert_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use omniconvert_core::testing::fixtures;

const BOUNDARY: &str = "omniconvert-test-boundary";

/// Test fixture for in-process API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_convert() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.convert("notes.txt", b"hello", "pdf").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The service behind the router, for direct inspection
    pub service: Arc<ConversionService>,
    /// Temporary directory for stored originals and artifacts
    pub temp_dir: TempDir,
}

/// Knobs for a test fixture.
pub struct TestConfig {
    /// Registry to serve; the built-in adapter table when `None`
    pub registry: Option<ConversionRegistry>,
    pub max_upload_mb: u64,
    pub artifacts_enabled: bool,
    pub originals_enabled: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            registry: None,
            max_upload_mb: 25,
            artifacts_enabled: true,
            originals_enabled: true,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    /// JSON body, or `Null` for non-JSON payloads
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn job_id(&self) -> i64 {
        self.header("x-conversion-job")
            .and_then(|v| v.parse().ok())
            .expect("response should carry a job id")
    }
}

impl TestFixture {
    /// Fixture serving the built-in adapter table.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Fixture serving a specific registry.
    pub fn with_registry(registry: ConversionRegistry) -> Self {
        Self::with_config(TestConfig {
            registry: Some(registry),
            ..Default::default()
        })
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("test.db");
        config.uploads.max_size_mb = test_config.max_upload_mb;
        config.storage.artifacts_dir = temp_dir.path().join("artifacts");
        config.storage.originals_dir = temp_dir.path().join("originals");
        config.storage.artifacts_enabled = test_config.artifacts_enabled;
        config.storage.originals_enabled = test_config.originals_enabled;

        let registry = test_config
            .registry
            .unwrap_or_else(|| builtin_registry(&config.converters));

        let ledger = Arc::new(SqliteJobLedger::in_memory().expect("Failed to create ledger"));
        let store = Arc::new(LocalArtifactStore::new(
            config.storage.artifacts_dir.clone(),
            config.storage.originals_dir.clone(),
            StoreToggles {
                artifacts_enabled: test_config.artifacts_enabled,
                originals_enabled: test_config.originals_enabled,
            },
        ));

        let service = Arc::new(ConversionService::new(
            Arc::new(registry),
            ledger,
            store,
            ServiceSettings::from_config(&config),
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&service)));
        let router = create_router(state);

        Self {
            router,
            service,
            temp_dir,
        }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    /// Make a POST request with an empty body
    pub async fn post(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    /// Upload `content` as `filename` to `POST /api/convert`.
    pub async fn convert(&self, filename: &str, content: &[u8], target_format: &str) -> TestResponse {
        let body = multipart_body(&[
            Part::text("target_format", target_format),
            Part::file("file", filename, content),
        ]);
        self.post_multipart("/api/convert", body).await
    }

    pub async fn post_multipart(&self, path: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// One part of a multipart form.
pub struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content,
        }
    }
}

/// Encode parts as `multipart/form-data` using the fixture boundary.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
