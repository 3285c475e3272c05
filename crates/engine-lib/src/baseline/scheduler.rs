//! Baseline recompute loop
//!
//! Periodically rebuilds the baseline for every tracked (service, metric)
//! key from a bounded lookback of history, fetched through the storage
//! boundary with timeout and retry. Each key recomputes independently: a
//! failed fetch skips that key's tick and keeps its prior snapshot.
//!
//! A per-key generation counter implements latest-tick-wins: if a newer
//! recompute for the same key has started by the time a result is ready,
//! the stale result is discarded instead of published.

use super::estimator::BaselineEstimator;
use super::store::{BaselineStore, MetricKey};
use crate::models::TimeRange;
use crate::observability::EngineMetrics;
use crate::storage::{query_with_retry, MetricStore, RetryPolicy};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Configuration for the recompute loop
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between recompute sweeps (default: 1 hour)
    pub cadence: Duration,
    /// Lookback window of history per recompute (default: 8 weeks)
    pub lookback: Duration,
    /// Storage read timeout/backoff policy
    pub retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(60 * 60),
            lookback: Duration::from_secs(8 * 7 * 24 * 60 * 60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Periodic baseline recomputation over all tracked keys
pub struct BaselineScheduler {
    store: Arc<dyn MetricStore>,
    baselines: Arc<BaselineStore>,
    keys: Arc<DashMap<MetricKey, ()>>,
    estimator: BaselineEstimator,
    config: SchedulerConfig,
    generations: DashMap<MetricKey, u64>,
    metrics: EngineMetrics,
}

impl BaselineScheduler {
    pub fn new(
        store: Arc<dyn MetricStore>,
        baselines: Arc<BaselineStore>,
        keys: Arc<DashMap<MetricKey, ()>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            baselines,
            keys,
            estimator: BaselineEstimator::default(),
            config,
            generations: DashMap::new(),
            metrics: EngineMetrics::new(),
        }
    }

    /// Run the recompute loop until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            cadence_secs = self.config.cadence.as_secs(),
            "Starting baseline scheduler"
        );

        let mut ticker = interval(self.config.cadence);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = chrono::Utc::now().timestamp();
                    self.recompute_all(now).await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down baseline scheduler");
                    break;
                }
            }
        }
    }

    /// Recompute every tracked key once, keys independent of each other
    pub async fn recompute_all(&self, now: i64) {
        let keys: Vec<MetricKey> = self.keys.iter().map(|entry| entry.key().clone()).collect();
        let start = Instant::now();
        let mut failures = 0usize;

        for key in &keys {
            if let Err(e) = self.recompute_key(key, now).await {
                failures += 1;
                warn!(
                    service = %key.0,
                    metric = %key.1,
                    error = %e,
                    "Baseline recompute skipped, keeping prior snapshot"
                );
            }
        }

        debug!(
            keys = keys.len(),
            failures,
            elapsed_ms = start.elapsed().as_millis(),
            "Baseline recompute sweep complete"
        );
    }

    /// Recompute one key; publishes only if still the newest recompute
    pub async fn recompute_key(&self, key: &MetricKey, now: i64) -> Result<(), crate::error::EngineError> {
        let generation = self.begin_generation(key);
        let start = Instant::now();

        let range = TimeRange::new(now - self.config.lookback.as_secs() as i64, now);
        let samples =
            query_with_retry(self.store.as_ref(), &key.0, &key.1, range, &self.config.retry)
                .await?;

        let history: Vec<(i64, f64)> = samples.iter().map(|s| (s.timestamp, s.value)).collect();
        let baseline = self.estimator.recompute(
            &key.0,
            &key.1,
            &history,
            now,
            self.config.cadence.as_secs() as i64,
        );

        self.metrics
            .observe_recompute_latency(start.elapsed().as_secs_f64());

        if !self.is_latest_generation(key, generation) {
            self.metrics.inc_stale_recomputes();
            debug!(
                service = %key.0,
                metric = %key.1,
                "Discarding stale baseline recompute result"
            );
            return Ok(());
        }

        debug!(
            service = %key.0,
            metric = %key.1,
            samples = baseline.sample_count,
            dominant = ?baseline.dominant_period,
            "Published baseline"
        );
        self.baselines.publish(baseline);
        Ok(())
    }

    fn begin_generation(&self, key: &MetricKey) -> u64 {
        let mut entry = self.generations.entry(key.clone()).or_insert(0);
        *entry += 1;
        *entry
    }

    fn is_latest_generation(&self, key: &MetricKey, generation: u64) -> bool {
        self.generations
            .get(key)
            .map(|entry| *entry.value() == generation)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricSample;
    use crate::storage::MemorySampleStore;

    fn tracked_keys(keys: &[(&str, &str)]) -> Arc<DashMap<MetricKey, ()>> {
        let map = DashMap::new();
        for (service, metric) in keys {
            map.insert((service.to_string(), metric.to_string()), ());
        }
        Arc::new(map)
    }

    fn scheduler_with_history(days: i64) -> (Arc<BaselineScheduler>, Arc<BaselineStore>) {
        let store = Arc::new(MemorySampleStore::new());
        let now = days * 86_400;
        for h in 0..days * 24 {
            store.append(MetricSample {
                service: "api".to_string(),
                metric: "rps".to_string(),
                timestamp: h * 3600,
                value: 100.0
                    + 50.0 * ((h % 24) as f64 / 24.0 * 2.0 * std::f64::consts::PI).sin(),
            });
        }

        let baselines = Arc::new(BaselineStore::new());
        let scheduler = Arc::new(BaselineScheduler::new(
            store,
            baselines.clone(),
            tracked_keys(&[("api", "rps")]),
            SchedulerConfig {
                lookback: Duration::from_secs(now as u64),
                ..Default::default()
            },
        ));
        (scheduler, baselines)
    }

    #[tokio::test]
    async fn test_recompute_publishes_baseline() {
        let (scheduler, baselines) = scheduler_with_history(14);
        scheduler.recompute_all(14 * 86_400).await;

        let baseline = baselines.get("api", "rps").unwrap();
        assert!(baseline.has_hourly_pattern);
        assert_eq!(baseline.sample_count, 14 * 24);
    }

    #[tokio::test]
    async fn test_stale_generation_is_discarded() {
        let (scheduler, baselines) = scheduler_with_history(14);
        let key = ("api".to_string(), "rps".to_string());

        // A newer recompute starts before the first publishes
        let stale_gen = scheduler.begin_generation(&key);
        let _newer_gen = scheduler.begin_generation(&key);
        assert!(!scheduler.is_latest_generation(&key, stale_gen));

        // Running the newer one end to end still publishes
        scheduler.recompute_key(&key, 14 * 86_400).await.unwrap();
        assert!(baselines.get("api", "rps").is_some());
    }

    #[tokio::test]
    async fn test_untracked_keys_do_nothing() {
        let store = Arc::new(MemorySampleStore::new());
        let baselines = Arc::new(BaselineStore::new());
        let scheduler = Arc::new(BaselineScheduler::new(
            store,
            baselines.clone(),
            Arc::new(DashMap::new()),
            SchedulerConfig::default(),
        ));

        scheduler.recompute_all(1000).await;
        assert!(baselines.is_empty());
    }
}
