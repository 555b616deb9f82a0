//! Prometheus metrics for the funds-cycle sync layer.
//!
//! All metrics follow the naming convention: `fc_<area>_<metric>_total`
//!
//! Counters live in a lazily built global registry. They count whether or
//! not `register_metrics` was called; registration only makes them visible
//! to `encode_metrics`.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // QUERY METRICS
    // =========================================================================

    /// Logical query fetches by outcome
    pub static ref QUERY_FETCHES: CounterVec = CounterVec::new(
        Opts::new("fc_query_fetches_total", "Logical query fetches"),
        &["query", "outcome"]  // outcome: ok/not_found/error
    ).expect("metric creation failed");

    /// Retries of logical queries after a transient failure
    pub static ref QUERY_RETRIES: CounterVec = CounterVec::new(
        Opts::new("fc_query_retries_total", "Logical query retries"),
        &["query"]
    ).expect("metric creation failed");

    /// Cache hits by freshness
    pub static ref CACHE_HITS: CounterVec = CounterVec::new(
        Opts::new("fc_cache_hits_total", "Query cache hits"),
        &["query", "freshness"]  // freshness: fresh/stale
    ).expect("metric creation failed");

    /// Invalidation passes after successful mutations
    pub static ref CACHE_INVALIDATIONS: Counter = Counter::new(
        "fc_cache_invalidations_total",
        "Cache invalidation passes"
    ).expect("metric creation failed");

    /// Scanned accounts dropped because they did not decode
    pub static ref SCAN_DISCARDS: Counter = Counter::new(
        "fc_scan_discards_total",
        "Scanned accounts discarded as undecodable"
    ).expect("metric creation failed");

    // =========================================================================
    // MUTATION METRICS
    // =========================================================================

    /// State transitions by outcome
    pub static ref MUTATIONS: CounterVec = CounterVec::new(
        Opts::new("fc_mutations_total", "State transitions"),
        &["kind", "outcome"]  // outcome: confirmed/unconfirmed/rejected/precondition/failed
    ).expect("metric creation failed");
}

/// Proof that the metrics are registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Queries
        Box::new(QUERY_FETCHES.clone()),
        Box::new(QUERY_RETRIES.clone()),
        Box::new(CACHE_HITS.clone()),
        Box::new(CACHE_INVALIDATIONS.clone()),
        Box::new(SCAN_DISCARDS.clone()),
        // Mutations
        Box::new(MUTATIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
