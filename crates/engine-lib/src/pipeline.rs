//! Pipeline wiring
//!
//! Connects the compute components to the per-key worker runtime and the
//! output sink:
//! - `MetricPipeline` routes samples by (service, metric), feeds the
//!   sample history store, and scores each sample against the latest
//!   baseline snapshot
//! - `LogPipeline` routes lines by service through template mining and
//!   the pattern sub-detectors
//! - `SloPipeline` accumulates good/bad counts and evaluates every loaded
//!   SLO once per tick

use crate::anomaly::{DetectorConfig, MetricAnomalyDetector};
use crate::baseline::{BaselineStore, MetricKey};
use crate::logmine::{MinerConfig, PatternConfig, PatternMonitor, TemplateMiner};
use crate::models::{LogRecord, MetricSample};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::sink::EventSink;
use crate::slo::SloEvaluator;
use crate::storage::MemorySampleStore;
use crate::worker::{async_trait, KeyWorker, WorkerPool};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::time::interval;
use tracing::{info, warn};

/// Scores samples for one (service, metric) key
struct MetricWorker {
    detector: MetricAnomalyDetector,
    baselines: Arc<BaselineStore>,
    sink: Arc<dyn EventSink>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

#[async_trait]
impl KeyWorker for MetricWorker {
    type Item = MetricSample;

    async fn process(&mut self, sample: MetricSample) {
        let start = Instant::now();
        let baseline = self.baselines.get(&sample.service, &sample.metric);

        if let Some(event) =
            self.detector
                .score(sample.value, sample.timestamp, baseline.as_deref())
        {
            self.logger.log_anomaly(&event);
            self.metrics.inc_anomalies_emitted();
            if let Err(e) = self.sink.emit_anomaly(&event).await {
                warn!(service = %event.service, error = %e, "Failed to emit anomaly event");
            }
        }

        self.metrics
            .observe_ingest_latency(start.elapsed().as_secs_f64());
    }
}

/// Metric scoring pipeline, partitioned by (service, metric)
pub struct MetricPipeline {
    pool: WorkerPool<MetricKey, MetricWorker>,
    store: Arc<MemorySampleStore>,
    keys: Arc<DashMap<MetricKey, ()>>,
    metrics: EngineMetrics,
}

impl MetricPipeline {
    pub fn new(
        store: Arc<MemorySampleStore>,
        baselines: Arc<BaselineStore>,
        sink: Arc<dyn EventSink>,
        detector_config: DetectorConfig,
        inbox_capacity: usize,
        instance: &str,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        let logger = StructuredLogger::new(instance);
        let pool = WorkerPool::new(inbox_capacity, shutdown, move |key: &MetricKey| {
            MetricWorker {
                detector: MetricAnomalyDetector::new(
                    key.0.clone(),
                    key.1.clone(),
                    detector_config.clone(),
                ),
                baselines: baselines.clone(),
                sink: sink.clone(),
                metrics: EngineMetrics::new(),
                logger: logger.clone(),
            }
        });

        Self {
            pool,
            store,
            keys: Arc::new(DashMap::new()),
            metrics: EngineMetrics::new(),
        }
    }

    /// Ingest one sample: record history, then route to the key's worker
    pub fn ingest(&self, sample: MetricSample) {
        let key = (sample.service.clone(), sample.metric.clone());
        self.keys.insert(key.clone(), ());
        self.store.append(sample.clone());

        if self.pool.dispatch(key, sample) {
            self.metrics.inc_queue_items_dropped();
        }
        self.metrics
            .set_metric_keys_tracked(self.keys.len() as i64);
    }

    /// Keys seen so far, shared with the baseline scheduler
    pub fn tracked_keys(&self) -> Arc<DashMap<MetricKey, ()>> {
        self.keys.clone()
    }

    pub fn dropped_items(&self) -> u64 {
        self.pool.total_dropped()
    }
}

/// Mines templates and runs pattern sub-detectors for one service
struct LogWorker {
    miner: TemplateMiner,
    monitor: PatternMonitor,
    sink: Arc<dyn EventSink>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

#[async_trait]
impl KeyWorker for LogWorker {
    type Item = LogRecord;

    async fn process(&mut self, record: LogRecord) {
        let start = Instant::now();

        let outcome = self.miner.ingest(
            record.timestamp,
            record.severity,
            &record.body,
            record.session_id,
        );

        if let Some(evicted) = &outcome.evicted {
            self.metrics.inc_templates_evicted();
            self.logger.log_template_evicted(&record.service, evicted);
        }

        let template = self
            .miner
            .template(&outcome.template_id)
            .expect("ingested template must exist")
            .clone();

        let events = self
            .monitor
            .observe(&template, outcome.created, record.timestamp);

        if let Err(e) = self.sink.upsert_template(&template).await {
            warn!(service = %record.service, error = %e, "Failed to upsert template");
        }
        if let Err(e) = self.sink.record_occurrence(&outcome.occurrence).await {
            warn!(service = %record.service, error = %e, "Failed to record occurrence");
        }
        for event in events {
            self.logger.log_anomaly(&event);
            self.metrics.inc_anomalies_emitted();
            if let Err(e) = self.sink.emit_anomaly(&event).await {
                warn!(service = %record.service, error = %e, "Failed to emit anomaly event");
            }
        }

        self.metrics
            .observe_ingest_latency(start.elapsed().as_secs_f64());
    }
}

/// Log mining pipeline, partitioned by service
pub struct LogPipeline {
    pool: WorkerPool<String, LogWorker>,
    metrics: EngineMetrics,
}

impl LogPipeline {
    pub fn new(
        sink: Arc<dyn EventSink>,
        miner_config: MinerConfig,
        pattern_config: PatternConfig,
        inbox_capacity: usize,
        instance: &str,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        let logger = StructuredLogger::new(instance);
        let pool = WorkerPool::new(inbox_capacity, shutdown, move |service: &String| {
            LogWorker {
                miner: TemplateMiner::new(service.clone(), miner_config.clone()),
                monitor: PatternMonitor::new(service.clone(), pattern_config.clone()),
                sink: sink.clone(),
                metrics: EngineMetrics::new(),
                logger: logger.clone(),
            }
        });

        Self {
            pool,
            metrics: EngineMetrics::new(),
        }
    }

    /// Ingest one log line, ordered per service, parallel across services
    pub fn ingest(&self, record: LogRecord) {
        let service = record.service.clone();
        if self.pool.dispatch(service, record) {
            self.metrics.inc_queue_items_dropped();
        }
    }

    pub fn dropped_items(&self) -> u64 {
        self.pool.total_dropped()
    }
}

/// SLO evaluation pipeline: per-tick accumulator plus evaluation loop
pub struct SloPipeline {
    evaluator: Mutex<SloEvaluator>,
    pending: DashMap<String, (u64, u64)>,
    sink: Arc<dyn EventSink>,
    tick_interval: Duration,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl SloPipeline {
    pub fn new(
        evaluator: SloEvaluator,
        sink: Arc<dyn EventSink>,
        tick_interval: Duration,
        instance: &str,
    ) -> Self {
        Self {
            evaluator: Mutex::new(evaluator),
            pending: DashMap::new(),
            sink,
            tick_interval,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new(instance),
        }
    }

    /// Accumulate good/bad counts for the next tick
    pub fn record_counts(&self, slo_id: &str, good: u64, bad: u64) {
        let mut entry = self.pending.entry(slo_id.to_string()).or_insert((0, 0));
        entry.0 += good;
        entry.1 += bad;
    }

    /// Run the evaluation loop until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            tick_secs = self.tick_interval.as_secs(),
            "Starting SLO evaluation loop"
        );

        let mut ticker = interval(self.tick_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Utc::now().timestamp();
                    self.evaluate_all(now).await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down SLO evaluation loop");
                    break;
                }
            }
        }
    }

    /// Evaluate every loaded SLO once; failures are isolated per id
    pub async fn evaluate_all(&self, now: i64) {
        let mut evaluator = self.evaluator.lock().await;

        for slo_id in evaluator.slo_ids() {
            let (good, bad) = self
                .pending
                .remove(&slo_id)
                .map(|(_, counts)| counts)
                .unwrap_or((0, 0));

            match evaluator.evaluate(&slo_id, good, bad, now) {
                Ok((measurement, status)) => {
                    self.metrics.inc_slo_evaluations();
                    self.logger.log_slo_status(&status);
                    if let Err(e) = self.sink.append_measurement(&measurement).await {
                        warn!(slo_id = %slo_id, error = %e, "Failed to append SLO measurement");
                    }
                    if let Err(e) = self.sink.upsert_status(&status).await {
                        warn!(slo_id = %slo_id, error = %e, "Failed to upsert SLO status");
                    }
                }
                Err(e) => {
                    self.metrics.inc_slo_evaluation_errors();
                    warn!(slo_id = %slo_id, error = %e, "SLO evaluation failed, continuing with others");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogSeverity, SLODefinition, SliOperator, SliType};
    use crate::sink::MemorySink;
    use crate::slo::EvaluatorConfig;

    fn test_sink() -> Arc<MemorySink> {
        Arc::new(MemorySink::new())
    }

    async fn drain(pipelines_settle_ms: u64) {
        tokio::time::sleep(Duration::from_millis(pipelines_settle_ms)).await;
    }

    #[tokio::test]
    async fn test_log_pipeline_end_to_end() {
        let sink = test_sink();
        let (shutdown, _) = broadcast::channel(1);
        let pipeline = LogPipeline::new(
            sink.clone(),
            MinerConfig::default(),
            PatternConfig::default(),
            64,
            "test",
            shutdown.clone(),
        );

        for (i, body) in ["User 123 logged in", "User 456 logged in"].iter().enumerate() {
            pipeline.ingest(LogRecord {
                service: "auth".to_string(),
                timestamp: 100 + i as i64 * 60,
                severity: LogSeverity::Info,
                body: body.to_string(),
                session_id: None,
            });
        }

        drain(100).await;

        let templates = sink.templates(Some("auth")).await;
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].template_string(), "User <*> logged in");
        assert_eq!(templates[0].total_count, 2);

        // The first line created a template and fired new_pattern
        let anomalies = sink.recent_anomalies(10).await;
        assert_eq!(anomalies.len(), 1);
        assert_eq!(sink.occurrence_count().await, 2);

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_slo_pipeline_evaluates_loaded_slos() {
        let sink = test_sink();
        let mut evaluator = SloEvaluator::new(EvaluatorConfig::default());
        evaluator.load_definitions(vec![SLODefinition {
            id: "slo-good".to_string(),
            sli_type: SliType::Availability,
            threshold: 1.0,
            operator: SliOperator::Gte,
            target_percentage: 99.9,
            window_days: 30,
            burn_rate_fast: 14.4,
            burn_rate_slow: 6.0,
        }]);

        let pipeline = Arc::new(SloPipeline::new(
            evaluator,
            sink.clone(),
            Duration::from_secs(60),
            "test",
        ));

        pipeline.record_counts("slo-good", 5940, 60);
        pipeline.evaluate_all(60).await;

        let statuses = sink.statuses().await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].slo_id, "slo-good");
        assert_eq!(sink.recent_measurements(10).await.len(), 1);
    }
}
