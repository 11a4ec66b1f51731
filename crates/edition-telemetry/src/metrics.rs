//! Prometheus metrics for edition assignment.
//!
//! All metrics follow the naming convention: `editions_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Assignment runs by outcome
    pub static ref ASSIGNMENT_RUNS: CounterVec = CounterVec::new(
        Opts::new("editions_assignment_runs_total", "Total edition assignment runs"),
        &["outcome"]  // success / capacity_exceeded / failed
    ).expect("metric creation failed");

    /// Line items (re)numbered
    pub static ref EDITIONS_ASSIGNED: Counter = Counter::new(
        "editions_assigned_total",
        "Total line items given an edition number"
    ).expect("metric creation failed");

    /// Oversold editions detected
    pub static ref CAPACITY_OVERFLOWS: Counter = Counter::new(
        "editions_capacity_overflows_total",
        "Assignment runs aborted because a limited edition was oversold"
    ).expect("metric creation failed");

    /// Time spent per assignment run once the product lock is held
    pub static ref ASSIGNMENT_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "editions_assignment_duration_seconds",
            "Time spent assigning edition numbers for one product"
        ).buckets(exponential_buckets(0.0005, 2.0, 15).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// How an assignment run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Success,
    CapacityExceeded,
    Failed,
}

impl AssignmentOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            AssignmentOutcome::Success => "success",
            AssignmentOutcome::CapacityExceeded => "capacity_exceeded",
            AssignmentOutcome::Failed => "failed",
        }
    }
}

/// Record one finished assignment run.
pub fn record_assignment(outcome: AssignmentOutcome, assigned: usize) {
    ASSIGNMENT_RUNS
        .with_label_values(&[outcome.as_label()])
        .inc();
    match outcome {
        AssignmentOutcome::Success => EDITIONS_ASSIGNED.inc_by(assigned as f64),
        AssignmentOutcome::CapacityExceeded => CAPACITY_OVERFLOWS.inc(),
        AssignmentOutcome::Failed => {}
    }
}

/// Handle to the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already-registered metrics are kept.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ASSIGNMENT_RUNS.clone()),
        Box::new(EDITIONS_ASSIGNED.clone()),
        Box::new(CAPACITY_OVERFLOWS.clone()),
        Box::new(ASSIGNMENT_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
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

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
