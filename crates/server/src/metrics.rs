//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Wavepress server:
//! - HTTP request metrics (latency, counts, in-flight)
//! - WebSocket connection metrics
//! - Upload and conversion counters
//! - Engine readiness and trigger state (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "wavepress_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavepress_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavepress_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavepress_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wavepress_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavepress_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when a client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "wavepress_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Intake and Conversion Metrics
// =============================================================================

/// Uploads by outcome (accepted / rejected).
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavepress_uploads_total", "File uploads by outcome"),
        &["outcome"],
    )
    .unwrap()
});

/// Conversions by outcome (success / failure).
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("wavepress_conversions_total", "Conversions by outcome"),
        &["outcome"],
    )
    .unwrap()
});

/// End-to-end conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "wavepress_conversion_duration_seconds",
            "End-to-end conversion duration in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Engine readiness (1 = loaded, 0 = not loaded).
pub static ENGINE_LOADED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavepress_engine_loaded",
        "Whether the transcoding engine is loaded (1) or not (0)",
    )
    .unwrap()
});

/// Conversion in flight (1 = trigger disarmed, 0 = idle).
pub static CONVERSION_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "wavepress_conversion_in_flight",
        "Whether a conversion is currently in flight",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Intake and conversion
    registry.register(Box::new(UPLOADS_TOTAL.clone())).unwrap();
    registry
        .register(Box::new(CONVERSIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(CONVERSION_DURATION.clone()))
        .unwrap();

    // Orchestrator
    registry.register(Box::new(ENGINE_LOADED.clone())).unwrap();
    registry
        .register(Box::new(CONVERSION_IN_FLIGHT.clone()))
        .unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the live orchestrator.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status().await;
    ENGINE_LOADED.set(if status.engine_loaded { 1 } else { 0 });
    CONVERSION_IN_FLIGHT.set(if status.converting { 1 } else { 0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("wavepress_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Touch all metrics so they appear in output (Prometheus only emits
        // metrics that have been accessed).
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        WS_CONNECTIONS_ACTIVE.set(0);
        WS_CONNECTIONS_TOTAL.inc();
        UPLOADS_TOTAL.with_label_values(&["accepted"]).inc();
        CONVERSIONS_TOTAL.with_label_values(&["success"]).inc();
        CONVERSION_DURATION.observe(1.0);
        ENGINE_LOADED.set(0);
        CONVERSION_IN_FLIGHT.set(0);

        let output = encode_metrics();

        assert!(output.contains("wavepress_http_request_duration_seconds"));
        assert!(output.contains("wavepress_http_requests_in_flight"));
        assert!(output.contains("wavepress_ws_connections_active"));
        assert!(output.contains("wavepress_uploads_total"));
        assert!(output.contains("wavepress_conversions_total"));
        assert!(output.contains("wavepress_conversion_duration_seconds"));
        assert!(output.contains("wavepress_engine_loaded"));
        assert!(output.contains("wavepress_conversion_in_flight"));
    }
}
