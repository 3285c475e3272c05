//! Versioned baseline snapshots per (service, metric) key
//!
//! Each recompute replaces the key's snapshot wholesale by swapping an
//! `Arc`. Readers clone the `Arc` and always see a complete, consistent
//! baseline; there is no in-place mutation.

use crate::models::SeasonalBaseline;
use dashmap::DashMap;
use std::sync::Arc;

/// Key identifying one metric series
pub type MetricKey = (String, String);

/// Per-key current baseline snapshots
#[derive(Default)]
pub struct BaselineStore {
    baselines: DashMap<MetricKey, Arc<SeasonalBaseline>>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self {
            baselines: DashMap::new(),
        }
    }

    /// Atomically replace the snapshot for the baseline's key
    pub fn publish(&self, baseline: SeasonalBaseline) {
        let key = (baseline.service.clone(), baseline.metric.clone());
        self.baselines.insert(key, Arc::new(baseline));
    }

    /// Current snapshot for a key, if one has been published
    pub fn get(&self, service: &str, metric: &str) -> Option<Arc<SeasonalBaseline>> {
        self.baselines
            .get(&(service.to_string(), metric.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::estimator::BaselineEstimator;

    #[test]
    fn test_publish_replaces_snapshot() {
        let store = BaselineStore::new();
        let estimator = BaselineEstimator::default();

        let first = estimator.recompute("api", "rps", &[(0, 1.0)], 100, 3600);
        store.publish(first);
        let snapshot = store.get("api", "rps").unwrap();
        assert_eq!(snapshot.valid_from, 100);

        let second = estimator.recompute("api", "rps", &[(0, 1.0), (60, 2.0)], 200, 3600);
        store.publish(second);

        // The old snapshot stays valid for existing readers
        assert_eq!(snapshot.valid_from, 100);
        assert_eq!(store.get("api", "rps").unwrap().valid_from, 200);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let store = BaselineStore::new();
        assert!(store.get("api", "rps").is_none());
    }
}
