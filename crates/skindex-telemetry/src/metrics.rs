//! Prometheus metrics for skindex.
//!
//! Covers:
//! - Provider requests and retries
//! - Rate limiter queueing
//! - Catalog sync results
//! - Index valuations
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a programming error that should crash at
//! startup. These panics only occur during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, register_int_counter,
    CounterVec, Encoder, GaugeVec, HistogramVec, IntCounter, TextEncoder,
};

/// Provider requests by market and outcome.
/// Labels: market, outcome (ok/unlisted/transient/permanent)
pub static PROVIDER_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "skindex_provider_requests_total",
        "Total pricing provider requests",
        &["market", "outcome"]
    )
    .unwrap()
});

/// Retries scheduled after a transient provider failure.
pub static PROVIDER_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "skindex_provider_retries_total",
        "Total provider retries after transient failures",
        &["operation"]
    )
    .unwrap()
});

/// Provider request latency in milliseconds.
pub static PROVIDER_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "skindex_provider_latency_ms",
        "Pricing provider request latency in milliseconds",
        &["operation"],
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Requests that had to wait for rate limiter capacity.
pub static RATE_LIMIT_WAITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "skindex_rate_limit_waits_total",
        "Requests queued behind the shared rate limiter"
    )
    .unwrap()
});

/// Catalog sync item outcomes.
/// Labels: outcome (added/updated/unchanged/failed)
pub static CATALOG_SYNC_ITEMS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "skindex_catalog_sync_items_total",
        "Catalog sync item outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Index valuations by outcome (ok/partial/error).
pub static VALUATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "skindex_valuations_total",
        "Total index valuations",
        &["index_id", "outcome"]
    )
    .unwrap()
});

/// Last computed value per index.
pub static INDEX_VALUE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "skindex_index_value",
        "Last computed aggregate value per index",
        &["index_id"]
    )
    .unwrap()
});

/// Fraction of items priced in the last valuation.
pub static INDEX_RESOLVED_RATIO: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "skindex_index_resolved_ratio",
        "Fraction of index items priced in the last valuation",
        &["index_id"]
    )
    .unwrap()
});

/// Valuation duration in milliseconds.
pub static VALUATION_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "skindex_valuation_duration_ms",
        "Index valuation wall time in milliseconds",
        &["index_id"],
        vec![50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0, 15000.0, 60000.0, 300000.0]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    // =========================================================================
    // Provider
    // =========================================================================

    /// Record a provider request outcome.
    pub fn provider_request(market: &str, outcome: &str) {
        PROVIDER_REQUESTS_TOTAL
            .with_label_values(&[market, outcome])
            .inc();
    }

    /// Record a retry.
    pub fn provider_retry(operation: &str) {
        PROVIDER_RETRIES_TOTAL.with_label_values(&[operation]).inc();
    }

    /// Record request latency.
    pub fn provider_latency(operation: &str, latency_ms: f64) {
        PROVIDER_LATENCY_MS
            .with_label_values(&[operation])
            .observe(latency_ms);
    }

    /// Record a request queued behind the rate limiter.
    pub fn rate_limit_wait() {
        RATE_LIMIT_WAITS_TOTAL.inc();
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Record catalog sync counts.
    pub fn catalog_sync(added: u64, updated: u64, unchanged: u64, failed: u64) {
        for (outcome, count) in [
            ("added", added),
            ("updated", updated),
            ("unchanged", unchanged),
            ("failed", failed),
        ] {
            CATALOG_SYNC_ITEMS_TOTAL
                .with_label_values(&[outcome])
                .inc_by(count as f64);
        }
    }

    // =========================================================================
    // Valuation
    // =========================================================================

    /// Record a completed valuation.
    pub fn valuation(index_id: &str, value: f64, resolved_ratio: f64, complete: bool) {
        let outcome = if complete { "ok" } else { "partial" };
        VALUATIONS_TOTAL
            .with_label_values(&[index_id, outcome])
            .inc();
        INDEX_VALUE.with_label_values(&[index_id]).set(value);
        INDEX_RESOLVED_RATIO
            .with_label_values(&[index_id])
            .set(resolved_ratio);
    }

    /// Record a failed valuation.
    pub fn valuation_failed(index_id: &str) {
        VALUATIONS_TOTAL
            .with_label_values(&[index_id, "error"])
            .inc();
    }

    /// Record valuation duration.
    pub fn valuation_duration(index_id: &str, duration_ms: f64) {
        VALUATION_DURATION_MS
            .with_label_values(&[index_id])
            .observe(duration_ms);
    }

    /// Render the default registry in Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
