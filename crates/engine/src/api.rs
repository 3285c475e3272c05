//! HTTP API: health checks, Prometheus metrics, ingest, and snapshots

use engine_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{LogRecord, MetricSample},
    pipeline::{LogPipeline, MetricPipeline, SloPipeline},
    sink::MemorySink,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub sink: Arc<MemorySink>,
    pub metric_pipeline: Arc<MetricPipeline>,
    pub log_pipeline: Arc<LogPipeline>,
    pub slo_pipeline: Arc<SloPipeline>,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Accept a batch of metric samples
async fn ingest_metrics(
    State(state): State<Arc<AppState>>,
    Json(samples): Json<Vec<MetricSample>>,
) -> impl IntoResponse {
    for sample in samples {
        state.metric_pipeline.ingest(sample);
    }
    StatusCode::ACCEPTED
}

/// Accept a batch of log lines
async fn ingest_logs(
    State(state): State<Arc<AppState>>,
    Json(records): Json<Vec<LogRecord>>,
) -> impl IntoResponse {
    for record in records {
        state.log_pipeline.ingest(record);
    }
    StatusCode::ACCEPTED
}

#[derive(Debug, Deserialize)]
struct SloCounts {
    slo_id: String,
    good_count: u64,
    bad_count: u64,
}

/// Accept good/bad counts for the next SLO evaluation tick
async fn ingest_slo_counts(
    State(state): State<Arc<AppState>>,
    Json(counts): Json<Vec<SloCounts>>,
) -> impl IntoResponse {
    for c in counts {
        state
            .slo_pipeline
            .record_counts(&c.slo_id, c.good_count, c.bad_count);
    }
    StatusCode::ACCEPTED
}

#[derive(Debug, Deserialize)]
struct TemplateQuery {
    service: Option<String>,
}

/// Snapshot of mined templates, most frequent first
async fn list_templates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TemplateQuery>,
) -> impl IntoResponse {
    let templates = state.sink.templates(query.service.as_deref()).await;
    Json(templates)
}

/// Current status row per SLO
async fn list_slos(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let statuses = state.sink.statuses().await;
    Json(statuses)
}

#[derive(Debug, Deserialize)]
struct AnomalyQuery {
    #[serde(default = "default_anomaly_limit")]
    limit: usize,
}

fn default_anomaly_limit() -> usize {
    100
}

/// Most recent anomaly events
async fn list_anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnomalyQuery>,
) -> impl IntoResponse {
    let anomalies = state.sink.recent_anomalies(query.limit).await;
    Json(anomalies)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/v1/metrics", post(ingest_metrics))
        .route("/v1/logs", post(ingest_logs))
        .route("/v1/slo/counts", post(ingest_slo_counts))
        .route("/v1/templates", get(list_templates))
        .route("/v1/slos", get(list_slos))
        .route("/v1/anomalies", get(list_anomalies))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
