//! Prometheus metrics for monitoring the relay server.
//!
//! This module provides a centralized metrics registry for inbound requests,
//! upstream attempts, retries and fallback bodies.

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of inbound requests by method, endpoint and status
    pub request_count: IntCounterVec,

    /// Inbound request duration histogram in seconds
    pub request_duration: HistogramVec,

    /// Number of currently active requests by endpoint
    pub active_requests: GaugeVec,

    /// Upstream attempts by route and outcome
    pub upstream_attempts: IntCounterVec,

    /// Upstream attempt latency histogram in seconds
    pub upstream_latency: HistogramVec,

    /// Retries scheduled after a failed attempt
    pub retries: IntCounterVec,

    /// Fallback bodies returned instead of an upstream response
    pub fallbacks: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Subsequent calls return the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "llm_relay_requests_total",
            "Total number of inbound requests",
            &["method", "endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "llm_relay_request_duration_seconds",
            "Inbound request duration in seconds",
            &["method", "endpoint"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 240.0]
        )
        .expect("Failed to register request_duration metric");

        let active_requests = register_gauge_vec!(
            "llm_relay_active_requests",
            "Number of active requests",
            &["endpoint"]
        )
        .expect("Failed to register active_requests metric");

        let upstream_attempts = register_int_counter_vec!(
            "llm_relay_upstream_attempts_total",
            "Upstream attempts by route and outcome",
            &["route", "outcome"]
        )
        .expect("Failed to register upstream_attempts metric");

        let upstream_latency = register_histogram_vec!(
            "llm_relay_upstream_latency_seconds",
            "Upstream attempt latency in seconds",
            &["route"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
        )
        .expect("Failed to register upstream_latency metric");

        let retries = register_int_counter_vec!(
            "llm_relay_retries_total",
            "Retries scheduled after a failed upstream attempt",
            &["route"]
        )
        .expect("Failed to register retries metric");

        let fallbacks = register_int_counter_vec!(
            "llm_relay_fallbacks_total",
            "Fallback bodies returned in place of an upstream response",
            &["route", "kind"]
        )
        .expect("Failed to register fallbacks metric");

        Metrics {
            request_count,
            request_duration,
            active_requests,
            upstream_attempts,
            upstream_latency,
            retries,
            fallbacks,
        }
    })
}

/// Get the global metrics instance, registering it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
