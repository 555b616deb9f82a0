//! # Funds-Cycle Telemetry
//!
//! Logging and metrics shared by the funds-cycle sync workspace.
//!
//! ## Components
//!
//! - **Logs**: `tracing` subscriber with env filter, pretty or JSON output
//! - **Metrics**: Prometheus counters for queries, cache and mutations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `FC_JSON_LOGS` | `false` | JSON log lines |
//! | `FC_CONSOLE_OUTPUT` | `true` | Write logs at all |
//! | `FC_SERVICE_NAME` | `funds-cycle` | Service name |
//! | `FC_NETWORK` | `devnet` | Cluster name |

#![warn(missing_docs)]

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, CACHE_HITS, CACHE_INVALIDATIONS, MUTATIONS,
    QUERY_FETCHES, QUERY_RETRIES, SCAN_DISCARDS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    /// A metric could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Bad filter directive or similar.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard to hold for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Initialize metrics first (synchronous)
    let metrics_handle = register_metrics()?;
    tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
