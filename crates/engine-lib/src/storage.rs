//! Storage engine boundary
//!
//! The time-series store is an external collaborator: this module defines
//! the read interface the engine consumes, a timeout/retry wrapper that
//! converts hangs and failures into typed errors, and a bounded in-memory
//! implementation fed from the ingest path for standalone deployments.

use crate::error::EngineError;
use crate::models::{MetricSample, TimeRange};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

pub use async_trait::async_trait;

/// Read interface to the time-series storage engine
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Fetch samples for one (service, metric) key within a time range,
    /// ordered by timestamp
    async fn query_samples(
        &self,
        service: &str,
        metric: &str,
        range: TimeRange,
    ) -> Result<Vec<MetricSample>, EngineError>;
}

/// Timeout and bounded-backoff policy for storage reads
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Backoff before the first retry
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// Query the store with a per-attempt timeout and exponential backoff.
///
/// Every failure mode (timeout included) surfaces as
/// [`EngineError::StorageUnavailable`] once the retry budget is spent,
/// so a caller's tick can be skipped without ever hanging.
pub async fn query_with_retry(
    store: &dyn MetricStore,
    service: &str,
    metric: &str,
    range: TimeRange,
    policy: &RetryPolicy,
) -> Result<Vec<MetricSample>, EngineError> {
    let mut backoff = policy.initial_backoff;
    let mut last_error = String::new();

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(policy.max_backoff);
        }

        let result = tokio::time::timeout(
            policy.timeout,
            store.query_samples(service, metric, range),
        )
        .await;

        match result {
            Ok(Ok(samples)) => return Ok(samples),
            Ok(Err(e)) if !e.is_retryable() => return Err(e),
            Ok(Err(e)) => {
                last_error = e.to_string();
            }
            Err(_) => {
                last_error = format!("query timed out after {:?}", policy.timeout);
            }
        }

        warn!(
            service = %service,
            metric = %metric,
            attempt = attempt + 1,
            error = %last_error,
            "Storage query failed, backing off"
        );
    }

    Err(EngineError::storage_unavailable(format!(
        "{} retries exhausted: {}",
        policy.max_retries, last_error
    )))
}

/// Default retention for the in-memory sample store (8 weeks)
const DEFAULT_RETENTION_SECS: i64 = 8 * 7 * 24 * 60 * 60;

/// Default per-key sample cap
const DEFAULT_MAX_SAMPLES_PER_KEY: usize = 100_000;

/// Bounded in-memory sample history, keyed by (service, metric)
///
/// Samples are appended from the ingest path and evicted by age and
/// per-key capacity, oldest first. Serves as the engine's default
/// [`MetricStore`] when no external store is wired in.
pub struct MemorySampleStore {
    series: DashMap<(String, String), VecDeque<MetricSample>>,
    retention_secs: i64,
    max_samples_per_key: usize,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self {
            series: DashMap::new(),
            retention_secs: DEFAULT_RETENTION_SECS,
            max_samples_per_key: DEFAULT_MAX_SAMPLES_PER_KEY,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention_secs = retention.as_secs() as i64;
        self
    }

    pub fn with_max_samples_per_key(mut self, max: usize) -> Self {
        self.max_samples_per_key = max;
        self
    }

    /// Append one sample, evicting expired and over-cap entries
    pub fn append(&self, sample: MetricSample) {
        let key = (sample.service.clone(), sample.metric.clone());
        let mut series = self.series.entry(key).or_default();

        let cutoff = sample.timestamp - self.retention_secs;
        while let Some(front) = series.front() {
            if front.timestamp < cutoff {
                series.pop_front();
            } else {
                break;
            }
        }

        while series.len() >= self.max_samples_per_key {
            series.pop_front();
        }

        series.push_back(sample);
    }

    /// Number of tracked (service, metric) keys
    pub fn key_count(&self) -> usize {
        self.series.len()
    }

    /// Total samples held across all keys
    pub fn sample_count(&self) -> usize {
        self.series.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for MemorySampleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricStore for MemorySampleStore {
    async fn query_samples(
        &self,
        service: &str,
        metric: &str,
        range: TimeRange,
    ) -> Result<Vec<MetricSample>, EngineError> {
        let key = (service.to_string(), metric.to_string());
        let samples = match self.series.get(&key) {
            Some(series) => series
                .iter()
                .filter(|s| range.contains(s.timestamp))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        debug!(
            service = %service,
            metric = %metric,
            count = samples.len(),
            "Sample history query"
        );
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample(service: &str, metric: &str, ts: i64, value: f64) -> MetricSample {
        MetricSample {
            service: service.to_string(),
            metric: metric.to_string(),
            timestamp: ts,
            value,
        }
    }

    #[tokio::test]
    async fn test_memory_store_query_range() {
        let store = MemorySampleStore::new();
        for i in 0..10 {
            store.append(sample("api", "latency_p99", 1000 + i * 60, i as f64));
        }

        let samples = store
            .query_samples("api", "latency_p99", TimeRange::new(1000, 1000 + 5 * 60))
            .await
            .unwrap();

        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].timestamp, 1000);
    }

    #[tokio::test]
    async fn test_memory_store_unknown_key_is_empty() {
        let store = MemorySampleStore::new();
        let samples = store
            .query_samples("api", "missing", TimeRange::new(0, i64::MAX))
            .await
            .unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_capacity_eviction() {
        let store = MemorySampleStore::new().with_max_samples_per_key(5);
        for i in 0..10 {
            store.append(sample("api", "rps", 1000 + i, i as f64));
        }

        let samples = store
            .query_samples("api", "rps", TimeRange::new(0, i64::MAX))
            .await
            .unwrap();

        // Oldest five evicted
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].value, 5.0);
    }

    #[tokio::test]
    async fn test_memory_store_retention_eviction() {
        let store = MemorySampleStore::new().with_retention(Duration::from_secs(100));
        store.append(sample("api", "rps", 1000, 1.0));
        store.append(sample("api", "rps", 2000, 2.0));

        let samples = store
            .query_samples("api", "rps", TimeRange::new(0, i64::MAX))
            .await
            .unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 2.0);
    }

    struct FlakyStore {
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl MetricStore for FlakyStore {
        async fn query_samples(
            &self,
            service: &str,
            metric: &str,
            _range: TimeRange,
        ) -> Result<Vec<MetricSample>, EngineError> {
            if self.failures_remaining.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(EngineError::storage_unavailable("connection reset"));
            }
            Ok(vec![sample(service, metric, 0, 1.0)])
        }
    }

    #[tokio::test]
    async fn test_query_with_retry_recovers() {
        let store = FlakyStore {
            failures_remaining: AtomicU32::new(2),
        };
        let policy = RetryPolicy {
            timeout: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            max_retries: 3,
        };

        let samples = query_with_retry(&store, "api", "rps", TimeRange::new(0, 10), &policy)
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[tokio::test]
    async fn test_query_with_retry_exhausts_budget() {
        let store = FlakyStore {
            failures_remaining: AtomicU32::new(100),
        };
        let policy = RetryPolicy {
            timeout: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            max_retries: 2,
        };

        let result = query_with_retry(&store, "api", "rps", TimeRange::new(0, 10), &policy).await;
        assert!(matches!(
            result,
            Err(EngineError::StorageUnavailable { .. })
        ));
    }
}
