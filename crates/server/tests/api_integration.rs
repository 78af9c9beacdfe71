//! HTTP API integration tests.
//!
//! Each test builds the router in-process around an in-memory ledger and a
//! temp-dir artifact store, then drives it with `oneshot` requests.

mod common;

use axum::http::StatusCode;
use common::{fixtures, multipart_body, Part, TestConfig, TestFixture};
use omniconvert_core::testing::always_fails;
use omniconvert_core::RegistryBuilder;

// ============================================================================
// Health, config and catalogue
// ============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["uploads"]["max_size_mb"], 25);
    assert_eq!(response.body["storage"]["backend"], "local");
    let text = String::from_utf8_lossy(&response.bytes);
    assert!(!text.contains("secret_key"));
}

#[tokio::test]
async fn test_formats_lists_direct_edges() {
    let fixture = TestFixture::with_registry(fixtures::two_hop_registry());

    let response = fixture.get("/api/formats").await;

    assert_eq!(response.status, StatusCode::OK);
    let formats = response.body.as_array().unwrap();
    let pptx = formats
        .iter()
        .find(|f| f["source"] == "pptx")
        .expect("pptx should be listed");
    assert_eq!(pptx["targets"][0]["ext"], "txt");
    assert_eq!(pptx["targets"][0]["note"], "text only");
}

#[tokio::test]
async fn test_expanded_formats_include_multi_hop_targets() {
    let fixture = TestFixture::with_registry(fixtures::two_hop_registry());

    let response = fixture.get("/api/formats/expanded").await;

    assert_eq!(response.status, StatusCode::OK);
    let pptx = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["source"] == "pptx")
        .cloned()
        .unwrap();
    let pdf = pptx["targets"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["ext"] == "pdf")
        .cloned()
        .expect("pdf should be reachable");
    assert_eq!(pdf["direct"], false);
    assert_eq!(pdf["via_chain"], true);
    assert_eq!(pdf["chain_len"], 2);
    assert_eq!(pdf["path"], serde_json::json!(["pptx", "txt", "pdf"]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/api/health").await;

    let response = fixture.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    let text = String::from_utf8_lossy(&response.bytes);
    assert!(text.contains("omniconvert_http_requests_total"));
}

// ============================================================================
// Conversion
// ============================================================================

#[tokio::test]
async fn test_convert_txt_to_pdf() {
    let fixture = TestFixture::new();

    let response = fixture.convert("notes.txt", b"hello world", "pdf").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.bytes.starts_with(b"%PDF"));
    assert!(response
        .header("content-disposition")
        .unwrap()
        .contains("filename=\"notes.pdf\""));
    assert_eq!(response.header("x-conversion-chain"), Some("txt->pdf"));

    let job = fixture
        .get(&format!("/api/jobs/{}", response.job_id()))
        .await;
    assert_eq!(job.status, StatusCode::OK);
    assert_eq!(job.body["status"], "success");
    assert_eq!(job.body["source_format"], "txt");
    assert_eq!(job.body["artifact_stored"], true);
    assert_eq!(job.body["original_stored"], true);
    assert!(job.body.get("share_token").is_none());
    assert!(job.body.get("artifact_path").is_none());
}

#[tokio::test]
async fn test_convert_falls_back_to_detour() {
    let fixture = TestFixture::with_registry(fixtures::failing_direct_registry());

    let response = fixture.convert("report.docx", b"body", "pdf").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, b"body|txt|pdf");
    assert_eq!(response.header("x-conversion-chain"), Some("docx->txt->pdf"));
    assert_eq!(response.header("x-conversion-fallbacks"), Some("1"));
    assert_eq!(response.header("content-type"), Some("application/x-pdf"));
}

#[tokio::test]
async fn test_convert_adapter_failure_is_500_and_recorded() {
    let registry = RegistryBuilder::new()
        .with_edge("docx", "pdf", always_fails("renderer crashed"), None)
        .build();
    let fixture = TestFixture::with_registry(registry);

    let response = fixture.convert("report.docx", b"body", "pdf").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["detail"], "test conversion failed: renderer crashed");

    let history = fixture.get("/api/history").await;
    let job = &history.body[0];
    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"], "test conversion failed: renderer crashed");
}

#[tokio::test]
async fn test_convert_unsupported_is_422_and_recorded() {
    let fixture = TestFixture::with_registry(fixtures::failing_direct_registry());

    let response = fixture.convert("report.docx", b"body", "mp3").await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["detail"], "Conversion path not available yet");

    let history = fixture.get("/api/history").await;
    assert_eq!(history.body[0]["status"], "failed");
    assert_eq!(history.body[0]["error"], "Conversion not supported yet");
}

#[tokio::test]
async fn test_convert_requires_extension() {
    let fixture = TestFixture::new();

    let response = fixture.convert("Makefile", b"all:", "pdf").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "Source file must have an extension");
}

#[tokio::test]
async fn test_convert_requires_target_and_file() {
    let fixture = TestFixture::new();

    let no_target = multipart_body(&[Part::file("file", "notes.txt", b"x")]);
    let response = fixture.post_multipart("/api/convert", no_target).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let no_file = multipart_body(&[Part::text("target_format", "pdf")]);
    let response = fixture.post_multipart("/api/convert", no_file).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "No file provided");
}

#[tokio::test]
async fn test_convert_rejects_oversized_upload() {
    let fixture = TestFixture::with_config(TestConfig {
        max_upload_mb: 1,
        ..Default::default()
    });

    let content = vec![b'a'; 1024 * 1024 + 1];
    let response = fixture.convert("big.txt", &content, "docx").await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.body["detail"], "File limit is 1 MB");

    // Rejected before a job is created
    let history = fixture.get("/api/history").await;
    assert_eq!(history.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_convert_rejects_body_over_transport_limit() {
    let fixture = TestFixture::with_config(TestConfig {
        max_upload_mb: 1,
        ..Default::default()
    });

    let content = vec![b'a'; 3 * 1024 * 1024];
    let response = fixture.convert("huge.txt", &content, "docx").await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn test_history_is_newest_first_and_limited() {
    let fixture = TestFixture::with_registry(fixtures::two_hop_registry());

    let mut ids = Vec::new();
    for name in ["a.pptx", "b.pptx", "c.pptx"] {
        let response = fixture.convert(name, b"deck", "pdf").await;
        assert_eq!(response.status, StatusCode::OK);
        ids.push(response.job_id());
    }

    let response = fixture.get("/api/history?limit=2").await;

    assert_eq!(response.status, StatusCode::OK);
    let jobs = response.body.as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], ids[2]);
    assert_eq!(jobs[1]["id"], ids[1]);
}

#[tokio::test]
async fn test_history_limit_zero_is_empty() {
    let fixture = TestFixture::new();

    let response = fixture.convert("notes.txt", b"hello", "pdf").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = fixture.get("/api/history?limit=0").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/jobs/999").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["detail"], "Job not found");
}

// ============================================================================
// Sharing and artifact download
// ============================================================================

#[tokio::test]
async fn test_artifact_is_open_without_share_token() {
    let fixture = TestFixture::new();
    let converted = fixture.convert("notes.txt", b"open", "pdf").await;

    let response = fixture
        .get(&format!("/api/jobs/{}/artifact", converted.job_id()))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, converted.bytes);
    assert!(response
        .header("content-disposition")
        .unwrap()
        .contains("notes.pdf"));
}

#[tokio::test]
async fn test_share_token_gates_artifact() {
    let fixture = TestFixture::new();
    let converted = fixture.convert("notes.txt", b"shared", "pdf").await;
    let job_id = converted.job_id();

    let share = fixture.post(&format!("/api/jobs/{}/share", job_id)).await;
    assert_eq!(share.status, StatusCode::OK);
    assert_eq!(share.body["job_id"], job_id);
    assert!(share.body["expires_at"].is_string());
    let share_url = share.body["share_url"].as_str().unwrap().to_string();
    assert!(share_url.starts_with(&format!("/api/jobs/{}/artifact?token=", job_id)));

    let without = fixture.get(&format!("/api/jobs/{}/artifact", job_id)).await;
    assert_eq!(without.status, StatusCode::FORBIDDEN);
    assert_eq!(without.body["detail"], "Token required or invalid");

    let wrong = fixture
        .get(&format!("/api/jobs/{}/artifact?token=nope", job_id))
        .await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);

    let with = fixture.get(&share_url).await;
    assert_eq!(with.status, StatusCode::OK);
    assert!(with.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_expired_share_token_is_rejected() {
    let fixture = TestFixture::new();
    let converted = fixture.convert("notes.txt", b"brief", "pdf").await;
    let job_id = converted.job_id();

    let share = fixture
        .post(&format!("/api/jobs/{}/share?ttl_s=0", job_id))
        .await;
    assert_eq!(share.status, StatusCode::OK);

    let response = fixture
        .get(share.body["share_url"].as_str().unwrap())
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["detail"], "Share token expired");
}

#[tokio::test]
async fn test_share_and_download_without_artifact() {
    let fixture = TestFixture::with_config(TestConfig {
        artifacts_enabled: false,
        ..Default::default()
    });
    let converted = fixture.convert("notes.txt", b"ephemeral", "pdf").await;
    assert_eq!(converted.status, StatusCode::OK);
    let job_id = converted.job_id();

    let share = fixture.post(&format!("/api/jobs/{}/share", job_id)).await;
    assert_eq!(share.status, StatusCode::BAD_REQUEST);

    let download = fixture.get(&format!("/api/jobs/{}/artifact", job_id)).await;
    assert_eq!(download.status, StatusCode::NOT_FOUND);
    assert_eq!(download.body["detail"], "No stored artifact for this job");
}

// ============================================================================
// Reconversion
// ============================================================================

#[tokio::test]
async fn test_reconvert_refreshes_artifact() {
    let fixture = TestFixture::new();
    let converted = fixture.convert("notes.txt", b"again", "docx").await;
    let job_id = converted.job_id();

    let response = fixture
        .post(&format!("/api/jobs/{}/reconvert", job_id))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["job_id"], job_id);
    assert_eq!(response.body["status"], "success");
    assert!(response.body["artifact"].is_string());

    let job = fixture.service.job(job_id).unwrap();
    assert_eq!(
        job.artifact_path.as_deref(),
        response.body["artifact"].as_str()
    );
}

#[tokio::test]
async fn test_reconvert_without_original() {
    let fixture = TestFixture::with_config(TestConfig {
        originals_enabled: false,
        ..Default::default()
    });
    let converted = fixture.convert("notes.txt", b"once", "docx").await;

    let response = fixture
        .post(&format!("/api/jobs/{}/reconvert", converted.job_id()))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "No original stored for this job");
}

#[tokio::test]
async fn test_reconvert_unknown_job() {
    let fixture = TestFixture::new();

    let response = fixture.post("/api/jobs/42/reconvert").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
