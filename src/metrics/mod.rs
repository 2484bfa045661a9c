//! Prometheus metrics for the scheduler
//!
//! Tracks scheduling decisions, message outcomes, index latency and the
//! failures of both external dependencies.
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::sync::{Mutex, OnceLock};

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all scheduler metrics
struct SchedulerMetrics {
    decisions: CounterVec,
    messages: CounterVec,
    index_errors: Counter,
    index_duration: Histogram,
    publish_errors: Counter,
    published: Counter,
}

static SCHEDULER_METRICS: OnceLock<SchedulerMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

/// Serializes concurrent `init_metrics` calls
static INIT_LOCK: Mutex<()> = Mutex::new(());

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = hsched::metrics::init_metrics() {
///     tracing::warn!(error = %e, "Metrics initialization failed");
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = SchedulerMetrics {
        decisions: register_counter_vec!(
            "hsched_decisions_total",
            "Scheduling decisions by result",
            &["decision"]
        )?,
        messages: register_counter_vec!(
            "hsched_messages_total",
            "Inbound messages by settlement outcome",
            &["outcome"]
        )?,
        index_errors: register_counter!(
            "hsched_index_errors_total",
            "Resource index queries that failed"
        )?,
        index_duration: register_histogram!(
            "hsched_index_query_duration_seconds",
            "Resource index query duration in seconds",
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        )?,
        publish_errors: register_counter!(
            "hsched_publish_errors_total",
            "Schedule requests that could not be published"
        )?,
        published: register_counter!(
            "hsched_published_total",
            "Schedule requests published"
        )?,
    };

    SCHEDULER_METRICS
        .set(metrics)
        .map_err(|_| "Scheduler metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    SCHEDULER_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one scheduling decision (`schedule`, `skip`, `invalid`)
pub fn record_decision(decision: &str) {
    if let Some(m) = SCHEDULER_METRICS.get() {
        m.decisions.with_label_values(&[decision]).inc();
    }
}

/// Record how an inbound message was settled
pub fn record_message(outcome: &str) {
    if let Some(m) = SCHEDULER_METRICS.get() {
        m.messages.with_label_values(&[outcome]).inc();
    }
}

pub fn record_index_error() {
    if let Some(m) = SCHEDULER_METRICS.get() {
        m.index_errors.inc();
    }
}

/// Record a publish attempt
pub fn record_publish(success: bool) {
    let Some(m) = SCHEDULER_METRICS.get() else {
        return;
    };

    if success {
        m.published.inc();
    } else {
        m.publish_errors.inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start an index query timer
pub fn start_index_timer() -> MetricsTimer {
    match SCHEDULER_METRICS.get() {
        Some(m) => MetricsTimer::new(m.index_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
