//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Conversions (outcome, duration, chain length)
//! - Fallback routing
//! - Artifact storage (saves, retention sweeps, presigning)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omniconvert_conversions_total", "Total conversion attempts"),
        &["result"], // "success", "failed", "unsupported"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omniconvert_conversion_duration_seconds",
            "Duration of chain execution including fallbacks",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"],
    )
    .unwrap()
});

/// Number of hops in the chain that produced the result.
pub static CHAIN_LENGTH: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "omniconvert_chain_length",
            "Number of hops in successfully executed chains",
        )
        .buckets(vec![0.0, 1.0, 2.0, 3.0, 4.0, 6.0]),
        &[],
    )
    .unwrap()
});

/// Single adapter step failures.
pub static STEP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "omniconvert_step_failures_total",
        "Total adapter invocations that failed",
    )
    .unwrap()
});

// =============================================================================
// Fallback Metrics
// =============================================================================

/// Fallback routing decisions by outcome.
pub static CHAIN_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "omniconvert_chain_fallbacks_total",
            "Alternate chain decisions after a failed chain",
        ),
        &["outcome"], // "attempted", "no_route", "repeated", "exhausted"
    )
    .unwrap()
});

// =============================================================================
// Storage Metrics
// =============================================================================

/// Blob saves by kind and result.
pub static STORAGE_SAVES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omniconvert_storage_saves_total", "Total blob save attempts"),
        &["kind", "result"], // kind: "original", "artifact"
    )
    .unwrap()
});

/// Blobs deleted by retention sweeps.
pub static RETENTION_DELETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "omniconvert_retention_deleted_total",
            "Total blobs deleted by retention sweeps",
        ),
        &["kind"],
    )
    .unwrap()
});

/// Retention sweep runs by result.
pub static RETENTION_SWEEPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omniconvert_retention_sweeps_total", "Total retention sweep runs"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Presign attempts by result.
pub static PRESIGN_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("omniconvert_presign_total", "Total presigned URL requests"),
        &["result"], // "issued", "unsupported", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Conversions
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(CHAIN_LENGTH.clone()),
        Box::new(STEP_FAILURES.clone()),
        // Fallback
        Box::new(CHAIN_FALLBACKS.clone()),
        // Storage
        Box::new(STORAGE_SAVES.clone()),
        Box::new(RETENTION_DELETED.clone()),
        Box::new(RETENTION_SWEEPS.clone()),
        Box::new(PRESIGN_TOTAL.clone()),
    ]
}
