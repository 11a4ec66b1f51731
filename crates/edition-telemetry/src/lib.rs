//! # Edition Telemetry
//!
//! Logging and metrics for edition assignment.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edition_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `edition-ledger` | Service name on every log line |
//! | `EDITIONS_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `EDITIONS_JSON_LOGS` | `false` | Emit JSON instead of human-readable logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, record_assignment, register_metrics, AssignmentOutcome, HistogramTimer,
    MetricsHandle, ASSIGNMENT_DURATION, ASSIGNMENT_RUNS, CAPACITY_OVERFLOWS, EDITIONS_ASSIGNED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Install logging and register metrics.
///
/// The returned guard keeps the metrics registry alive.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    init_logging(config)?;
    let metrics = register_metrics()?;

    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}
