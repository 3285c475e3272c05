//! Observability infrastructure for the analytics engine
//!
//! Provides:
//! - Prometheus metrics (ingest/recompute latency, template and key
//!   gauges, drop/eviction/error counters)
//! - Structured JSON logging with tracing for significant engine events

use crate::models::{AnomalyEvent, SLOStatus};
use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct EngineMetricsInner {
    ingest_latency_seconds: Histogram,
    recompute_latency_seconds: Histogram,
    metric_keys_tracked: IntGauge,
    templates_active: IntGauge,
    anomalies_emitted: IntGauge,
    queue_items_dropped: IntGauge,
    templates_evicted: IntGauge,
    stale_recomputes_discarded: IntGauge,
    slo_evaluations: IntGauge,
    slo_evaluation_errors: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            ingest_latency_seconds: register_histogram!(
                "analytics_engine_ingest_latency_seconds",
                "Time spent processing one ingested sample or log line",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register ingest_latency_seconds"),

            recompute_latency_seconds: register_histogram!(
                "analytics_engine_recompute_latency_seconds",
                "Time spent recomputing one seasonal baseline",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register recompute_latency_seconds"),

            metric_keys_tracked: register_int_gauge!(
                "analytics_engine_metric_keys_tracked",
                "Number of (service, metric) keys with live workers"
            )
            .expect("Failed to register metric_keys_tracked"),

            templates_active: register_int_gauge!(
                "analytics_engine_templates_active",
                "Number of log templates currently held across services"
            )
            .expect("Failed to register templates_active"),

            anomalies_emitted: register_int_gauge!(
                "analytics_engine_anomalies_emitted_total",
                "Total anomaly events emitted to the sink"
            )
            .expect("Failed to register anomalies_emitted"),

            queue_items_dropped: register_int_gauge!(
                "analytics_engine_queue_items_dropped_total",
                "Total items dropped from full worker inboxes"
            )
            .expect("Failed to register queue_items_dropped"),

            templates_evicted: register_int_gauge!(
                "analytics_engine_templates_evicted_total",
                "Total templates evicted at the per-service cap"
            )
            .expect("Failed to register templates_evicted"),

            stale_recomputes_discarded: register_int_gauge!(
                "analytics_engine_stale_recomputes_discarded_total",
                "Baseline recompute results discarded by a newer tick"
            )
            .expect("Failed to register stale_recomputes_discarded"),

            slo_evaluations: register_int_gauge!(
                "analytics_engine_slo_evaluations_total",
                "Total SLO evaluation ticks performed"
            )
            .expect("Failed to register slo_evaluations"),

            slo_evaluation_errors: register_int_gauge!(
                "analytics_engine_slo_evaluation_errors_total",
                "Total SLO evaluation ticks that failed"
            )
            .expect("Failed to register slo_evaluation_errors"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_ingest_latency(&self, duration_secs: f64) {
        self.inner().ingest_latency_seconds.observe(duration_secs);
    }

    pub fn observe_recompute_latency(&self, duration_secs: f64) {
        self.inner().recompute_latency_seconds.observe(duration_secs);
    }

    pub fn set_metric_keys_tracked(&self, count: i64) {
        self.inner().metric_keys_tracked.set(count);
    }

    pub fn set_templates_active(&self, count: i64) {
        self.inner().templates_active.set(count);
    }

    pub fn inc_anomalies_emitted(&self) {
        self.inner().anomalies_emitted.inc();
    }

    pub fn inc_queue_items_dropped(&self) {
        self.inner().queue_items_dropped.inc();
    }

    pub fn inc_templates_evicted(&self) {
        self.inner().templates_evicted.inc();
    }

    pub fn inc_stale_recomputes(&self) {
        self.inner().stale_recomputes_discarded.inc();
    }

    pub fn inc_slo_evaluations(&self) {
        self.inner().slo_evaluations.inc();
    }

    pub fn inc_slo_evaluation_errors(&self) {
        self.inner().slo_evaluation_errors.inc();
    }
}

/// Structured logger for engine events
///
/// Provides consistent JSON-formatted logging for anomalies, template
/// lifecycle, SLO transitions, and other significant events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log an emitted anomaly event
    pub fn log_anomaly(&self, event: &AnomalyEvent) {
        match event.severity {
            crate::models::Severity::Critical => {
                warn!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    service = %event.service,
                    target = %event.metric_or_pattern,
                    method = %event.method,
                    severity = %event.severity,
                    observed = event.observed,
                    expected = event.expected,
                    deviation_sigma = event.deviation_sigma,
                    score = event.score,
                    "Critical anomaly detected"
                );
            }
            _ => {
                info!(
                    event = "anomaly_detected",
                    instance = %self.instance,
                    service = %event.service,
                    target = %event.metric_or_pattern,
                    method = %event.method,
                    severity = %event.severity,
                    observed = event.observed,
                    expected = event.expected,
                    deviation_sigma = event.deviation_sigma,
                    score = event.score,
                    "Anomaly detected"
                );
            }
        }
    }

    /// Log a template eviction at the per-service cap
    pub fn log_template_evicted(&self, service: &str, template_id: &str) {
        info!(
            event = "template_evicted",
            instance = %self.instance,
            service = %service,
            template_id = %template_id,
            "Evicted least-recently-seen template"
        );
    }

    /// Log an SLO status transition
    pub fn log_slo_status(&self, status: &SLOStatus) {
        info!(
            event = "slo_status",
            instance = %self.instance,
            slo_id = %status.slo_id,
            alert_status = %status.alert_status,
            attainment = status.current_attainment,
            budget_remaining_percent = status.error_budget_remaining_percent,
            "SLO status updated"
        );
    }

    /// Log a dropped queue item
    pub fn log_queue_drop(&self, pipeline: &str, key: &str) {
        warn!(
            event = "queue_drop",
            instance = %self.instance,
            pipeline = %pipeline,
            key = %key,
            "Inbox full, dropped oldest unprocessed item"
        );
    }

    /// Log engine startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "engine_started",
            instance = %self.instance,
            engine_version = %version,
            "Analytics engine started"
        );
    }

    /// Log engine shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Analytics engine shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_metrics_creation() {
        // Metrics are registered once per process via the global registry;
        // repeated handles share the same instance.
        let metrics = EngineMetrics::new();

        metrics.observe_ingest_latency(0.001);
        metrics.observe_recompute_latency(0.1);
        metrics.set_metric_keys_tracked(3);
        metrics.set_templates_active(42);
        metrics.inc_anomalies_emitted();
        metrics.inc_queue_items_dropped();
        metrics.inc_templates_evicted();
        metrics.inc_stale_recomputes();
        metrics.inc_slo_evaluations();
        metrics.inc_slo_evaluation_errors();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("engine-1");
        assert_eq!(logger.instance, "engine-1");
    }
}
