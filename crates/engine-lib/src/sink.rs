//! Output sinks for external alerting and dashboard consumption
//!
//! The engine produces five record streams: anomaly events,
//! template upserts, pattern occurrences, SLO measurements, and SLO
//! status upserts. The sink trait is the production boundary; the
//! in-memory implementation backs the engine's snapshot endpoints
//! and tests.

use crate::models::{AnomalyEvent, LogPatternOccurrence, LogTemplate, SLOMeasurement, SLOStatus};
use anyhow::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub use async_trait::async_trait;

/// Destination for the engine's output record streams
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Append an anomaly event (append-only stream)
    async fn emit_anomaly(&self, event: &AnomalyEvent) -> Result<()>;

    /// Upsert a template, keyed by template id
    async fn upsert_template(&self, template: &LogTemplate) -> Result<()>;

    /// Append a pattern occurrence (append-only stream)
    async fn record_occurrence(&self, occurrence: &LogPatternOccurrence) -> Result<()>;

    /// Append an SLO measurement (append-only stream)
    async fn append_measurement(&self, measurement: &SLOMeasurement) -> Result<()>;

    /// Upsert the current SLO status, keyed by SLO id
    async fn upsert_status(&self, status: &SLOStatus) -> Result<()>;
}

/// Retained entries per append-only stream before the oldest are dropped
const DEFAULT_STREAM_CAPACITY: usize = 10_000;

/// Bounded in-memory sink
///
/// Upserted records (templates, statuses) are held in full; append-only
/// streams keep the most recent entries up to a capacity.
pub struct MemorySink {
    anomalies: RwLock<Vec<AnomalyEvent>>,
    templates: RwLock<HashMap<String, LogTemplate>>,
    occurrences: RwLock<Vec<LogPatternOccurrence>>,
    measurements: RwLock<Vec<SLOMeasurement>>,
    statuses: RwLock<HashMap<String, SLOStatus>>,
    stream_capacity: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            anomalies: RwLock::new(Vec::new()),
            templates: RwLock::new(HashMap::new()),
            occurrences: RwLock::new(Vec::new()),
            measurements: RwLock::new(Vec::new()),
            statuses: RwLock::new(HashMap::new()),
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    /// Most recent anomaly events, newest last
    pub async fn recent_anomalies(&self, limit: usize) -> Vec<AnomalyEvent> {
        let anomalies = self.anomalies.read().await;
        let start = anomalies.len().saturating_sub(limit);
        anomalies[start..].to_vec()
    }

    /// All templates, optionally filtered by service
    pub async fn templates(&self, service: Option<&str>) -> Vec<LogTemplate> {
        let templates = self.templates.read().await;
        let mut result: Vec<LogTemplate> = templates
            .values()
            .filter(|t| service.map(|s| t.service == s).unwrap_or(true))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.total_count.cmp(&a.total_count));
        result
    }

    /// Current status rows for all SLOs
    pub async fn statuses(&self) -> Vec<SLOStatus> {
        let statuses = self.statuses.read().await;
        let mut result: Vec<SLOStatus> = statuses.values().cloned().collect();
        result.sort_by(|a, b| a.slo_id.cmp(&b.slo_id));
        result
    }

    /// Most recent measurements, newest last
    pub async fn recent_measurements(&self, limit: usize) -> Vec<SLOMeasurement> {
        let measurements = self.measurements.read().await;
        let start = measurements.len().saturating_sub(limit);
        measurements[start..].to_vec()
    }

    pub async fn occurrence_count(&self) -> usize {
        self.occurrences.read().await.len()
    }

    fn truncate_front<T>(buffer: &mut Vec<T>, capacity: usize) {
        if buffer.len() > capacity {
            let excess = buffer.len() - capacity;
            buffer.drain(0..excess);
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn emit_anomaly(&self, event: &AnomalyEvent) -> Result<()> {
        let mut anomalies = self.anomalies.write().await;
        anomalies.push(event.clone());
        Self::truncate_front(&mut anomalies, self.stream_capacity);
        Ok(())
    }

    async fn upsert_template(&self, template: &LogTemplate) -> Result<()> {
        let mut templates = self.templates.write().await;
        templates.insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn record_occurrence(&self, occurrence: &LogPatternOccurrence) -> Result<()> {
        let mut occurrences = self.occurrences.write().await;
        occurrences.push(occurrence.clone());
        Self::truncate_front(&mut occurrences, self.stream_capacity);
        Ok(())
    }

    async fn append_measurement(&self, measurement: &SLOMeasurement) -> Result<()> {
        let mut measurements = self.measurements.write().await;
        measurements.push(measurement.clone());
        Self::truncate_front(&mut measurements, self.stream_capacity);
        Ok(())
    }

    async fn upsert_status(&self, status: &SLOStatus) -> Result<()> {
        let mut statuses = self.statuses.write().await;
        statuses.insert(status.slo_id.clone(), status.clone());
        Ok(())
    }
}
