//! Analytics Engine - telemetry analytics daemon
//!
//! Runs the compute pipelines (baseline estimation, anomaly detection,
//! log template mining, SLO evaluation) behind an HTTP ingest and
//! snapshot API.

use anyhow::Result;
use engine_lib::{
    anomaly::DetectorConfig,
    baseline::{BaselineScheduler, BaselineStore, SchedulerConfig},
    health::{components, HealthRegistry},
    logmine::{MinerConfig, PatternConfig},
    observability::{EngineMetrics, StructuredLogger},
    pipeline::{LogPipeline, MetricPipeline, SloPipeline},
    sink::MemorySink,
    slo::{EvaluatorConfig, SloEvaluator},
    storage::MemorySampleStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting analytics-engine");

    // Load configuration
    let config = config::EngineConfig::load()?;
    info!(instance = %config.instance_name, "Engine configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::BASELINE).await;
    health_registry.register(components::DETECTOR).await;
    health_registry.register(components::LOG_MINER).await;
    health_registry.register(components::SLO_EVALUATOR).await;
    health_registry.register(components::SINK).await;

    // Initialize metrics and structured logging
    let _metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(ENGINE_VERSION);

    // Shared state: sample history, baseline snapshots, output sink
    let sample_store = Arc::new(MemorySampleStore::new());
    let baselines = Arc::new(BaselineStore::new());
    let sink = Arc::new(MemorySink::new());

    let (shutdown_tx, _) = broadcast::channel(4);

    // Metric scoring pipeline
    let metric_pipeline = Arc::new(MetricPipeline::new(
        sample_store.clone(),
        baselines.clone(),
        sink.clone(),
        DetectorConfig::default(),
        config.inbox_capacity,
        &config.instance_name,
        shutdown_tx.clone(),
    ));

    // Log mining pipeline
    let log_pipeline = Arc::new(LogPipeline::new(
        sink.clone(),
        MinerConfig {
            merge_threshold: config.merge_threshold,
            template_cap: config.template_cap,
            ..Default::default()
        },
        PatternConfig::default(),
        config.inbox_capacity,
        &config.instance_name,
        shutdown_tx.clone(),
    ));

    // SLO evaluation pipeline; definitions arrive from configuration
    let mut evaluator = SloEvaluator::new(EvaluatorConfig::default());
    if let Ok(raw) = std::env::var("ENGINE_SLO_DEFINITIONS") {
        match serde_json::from_str(&raw) {
            Ok(definitions) => evaluator.load_definitions(definitions),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparseable ENGINE_SLO_DEFINITIONS");
            }
        }
    }
    let slo_pipeline = Arc::new(SloPipeline::new(
        evaluator,
        sink.clone(),
        Duration::from_secs(config.slo_tick_secs),
        &config.instance_name,
    ));

    // Baseline recompute loop over the keys the metric pipeline tracks
    let scheduler = Arc::new(BaselineScheduler::new(
        sample_store.clone(),
        baselines,
        metric_pipeline.tracked_keys(),
        SchedulerConfig {
            cadence: Duration::from_secs(config.recompute_interval_secs),
            ..Default::default()
        },
    ));

    tokio::spawn(scheduler.run(shutdown_tx.subscribe()));
    tokio::spawn(slo_pipeline.clone().run(shutdown_tx.subscribe()));

    // Create shared application state and start the API server
    let app_state = Arc::new(api::AppState {
        health_registry: health_registry.clone(),
        sink,
        metric_pipeline,
        log_pipeline,
        slo_pipeline,
    });

    health_registry.set_ready(true).await;

    let api_port = config.api_port;
    tokio::spawn(api::serve(api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());
    info!("Shutting down");

    Ok(())
}
