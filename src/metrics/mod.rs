//! Prometheus metrics for the refresh loop and the definition cache
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all hub metrics
struct HubMetrics {
    cycles: CounterVec,
    cycle_duration: Histogram,
    descriptor_fetches: CounterVec,
    services_skipped: CounterVec,
    cached_definitions: Gauge,
}

/// Global storage for hub metrics
static HUB_METRICS: OnceLock<HubMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = HubMetrics {
        cycles: register_counter_vec!(
            "docshub_refresh_cycles_total",
            "Refresh cycles by outcome",
            &["outcome"]
        )?,
        cycle_duration: register_histogram!(
            "docshub_refresh_cycle_duration_seconds",
            "Duration of a completed refresh cycle in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
        )?,
        descriptor_fetches: register_counter_vec!(
            "docshub_descriptor_fetches_total",
            "Descriptor fetches by result",
            &["result"]
        )?,
        services_skipped: register_counter_vec!(
            "docshub_services_skipped_total",
            "Services skipped during a cycle by reason",
            &["reason"]
        )?,
        cached_definitions: register_gauge!(
            "docshub_cached_definitions",
            "Number of definitions currently cached"
        )?,
    };

    HUB_METRICS.set(metrics).map_err(|_| "Hub metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    HUB_METRICS.get().is_some()
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

/// Record a finished (or skipped) cycle
pub fn record_cycle(outcome: &str, duration_secs: Option<f64>) {
    let Some(m) = HUB_METRICS.get() else {
        return;
    };

    m.cycles.with_label_values(&[outcome]).inc();
    if let Some(secs) = duration_secs {
        m.cycle_duration.observe(secs);
    }
}

/// Record one descriptor fetch
pub fn record_fetch(success: bool) {
    if let Some(m) = HUB_METRICS.get() {
        let result = if success { "success" } else { "failure" };
        m.descriptor_fetches.with_label_values(&[result]).inc();
    }
}

/// Record a skipped service
pub fn record_service_skipped(reason: &str) {
    if let Some(m) = HUB_METRICS.get() {
        m.services_skipped.with_label_values(&[reason]).inc();
    }
}

/// Update cache size gauge
pub fn set_cached_definitions(count: usize) {
    if let Some(m) = HUB_METRICS.get() {
        m.cached_definitions.set(count as f64);
    }
}
