//! Conversion endpoints: upload-and-convert plus the format catalogue.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::debug;

use omniconvert_core::{ConvertRequest, FormatDescriptor, ReachableDescriptor};

use super::error::ApiError;
use crate::metrics::UPLOAD_BYTES;
use crate::state::AppState;

pub const JOB_HEADER: &str = "x-conversion-job";
pub const CHAIN_HEADER: &str = "x-conversion-chain";
pub const FALLBACKS_HEADER: &str = "x-conversion-fallbacks";

/// GET /api/formats
pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<Vec<FormatDescriptor>> {
    Json(state.service().formats())
}

/// GET /api/formats/expanded
///
/// Every target reachable from each source, with the hop path.
pub async fn list_expanded_formats(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<ReachableDescriptor>> {
    Json(state.service().expanded_formats())
}

/// POST /api/convert
///
/// Multipart form with a `target_format` text field and a `file` part.
/// Responds with the converted bytes as an attachment.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let limit_mb = state.service().settings().max_upload_mb;

    let mut target_format: Option<String> = None;
    let mut upload: Option<(String, Option<String>, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(ApiError::from_multipart(e, limit_mb)),
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("uploaded").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, limit_mb))?;
                upload = Some((filename, content_type, bytes.to_vec()));
            }
            "target_format" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::from_multipart(e, limit_mb))?;
                target_format = Some(text);
            }
            _ => {}
        }
    }

    let target_format = match target_format {
        Some(t) if !t.trim().is_empty() => t,
        _ => return Err(ApiError::bad_request("target_format is required")),
    };
    let (filename, content_type, content) =
        upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    UPLOAD_BYTES.observe(content.len() as f64);
    debug!(filename = %filename, size = content.len(), target = %target_format, "Upload received");

    let result = state
        .service()
        .convert(ConvertRequest {
            filename,
            target_format,
            content,
            content_type,
        })
        .await?;

    let mut headers = attachment_headers(&result.mime_type, &result.filename);
    insert_header(&mut headers, JOB_HEADER, &result.job.id.to_string());
    insert_header(&mut headers, CHAIN_HEADER, &result.chain.describe());
    insert_header(&mut headers, FALLBACKS_HEADER, &result.fallbacks.to_string());

    Ok((StatusCode::OK, headers, result.content))
}

/// Content type plus `Content-Disposition: attachment` for a download.
pub fn attachment_headers(mime_type: &str, filename: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);

    // Plain ASCII fallback first, then the exact name percent-encoded
    let ascii: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
