use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::conversions::{CHAIN_HEADER, FALLBACKS_HEADER, JOB_HEADER};
use super::{conversions, handlers, jobs, middleware::metrics_middleware};
use crate::state::AppState;

/// Room for multipart boundaries and the form fields around the file part
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.service().settings().max_upload_bytes() as usize + MULTIPART_OVERHEAD_BYTES;
    let cors = cors_layer(&state.config().server.allowed_origins);

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Formats
        .route("/formats", get(conversions::list_formats))
        .route("/formats/expanded", get(conversions::list_expanded_formats))
        // Conversion
        .route(
            "/convert",
            post(conversions::convert).layer(DefaultBodyLimit::max(body_limit)),
        )
        // Jobs
        .route("/history", get(jobs::history))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/reconvert", post(jobs::reconvert))
        .route("/jobs/{id}/share", post(jobs::share))
        .route("/jobs/{id}/artifact", get(jobs::download_artifact))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured origins. `"*"` anywhere in the list allows any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let exposed = [JOB_HEADER, CHAIN_HEADER, FALLBACKS_HEADER]
        .map(HeaderName::from_static);
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(exposed);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
