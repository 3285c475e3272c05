//! Core data models for the analytics engine

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A single metric observation, produced by the collection pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub service: String,
    pub metric: String,
    pub timestamp: i64,
    pub value: f64,
}

/// Inclusive start / exclusive end range of unix-second timestamps
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// A raw log line entering the mining pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub service: String,
    pub timestamp: i64,
    pub severity: LogSeverity,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Log line severity levels tracked per template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogSeverity {
    pub fn is_error(&self) -> bool {
        matches!(self, LogSeverity::Error | LogSeverity::Fatal)
    }
}

/// Per-severity occurrence counts for a log template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub info: u64,
    pub warn: u64,
    pub error: u64,
    pub fatal: u64,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: LogSeverity) {
        match severity {
            LogSeverity::Info => self.info += 1,
            LogSeverity::Warn => self.warn += 1,
            LogSeverity::Error => self.error += 1,
            LogSeverity::Fatal => self.fatal += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.info + self.warn + self.error + self.fatal
    }

    /// Fraction of occurrences at error or fatal severity
    pub fn error_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.error + self.fatal) as f64 / total as f64
    }
}

/// Seasonal granularities a baseline can detect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalPeriod {
    Hourly,
    Daily,
    Weekly,
}

impl std::fmt::Display for SeasonalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeasonalPeriod::Hourly => write!(f, "hourly"),
            SeasonalPeriod::Daily => write!(f, "daily"),
            SeasonalPeriod::Weekly => write!(f, "weekly"),
        }
    }
}

/// Learned periodic statistics for one (service, metric) key
///
/// Owned exclusively by the baseline estimator and replaced wholesale on
/// each recompute. Readers hold an `Arc` snapshot and never observe a
/// partially-updated baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalBaseline {
    pub service: String,
    pub metric: String,

    /// Hour-of-day buckets (24 entries)
    pub hourly_means: Vec<f64>,
    pub hourly_stds: Vec<f64>,
    pub hourly_counts: Vec<u64>,

    /// Day-of-week buckets (7 entries, Monday first)
    pub daily_means: Vec<f64>,
    pub daily_stds: Vec<f64>,
    pub daily_counts: Vec<u64>,

    /// Hour-of-week buckets (168 entries)
    pub weekly_means: Vec<f64>,
    pub weekly_stds: Vec<f64>,
    pub weekly_counts: Vec<u64>,

    pub global_mean: f64,
    pub global_std: f64,

    pub has_hourly_pattern: bool,
    pub has_daily_pattern: bool,
    pub has_weekly_pattern: bool,

    /// Ratio of between-bucket variance to total variance, in [0, 1]
    pub hourly_strength: f64,
    pub daily_strength: f64,
    pub weekly_strength: f64,

    /// Strongest detected granularity, finer granularities win ties
    pub dominant_period: Option<SeasonalPeriod>,

    pub valid_from: i64,
    pub valid_to: i64,
    pub sample_count: u64,
}

/// Expected value, spread, and confidence for one lookup timestamp
#[derive(Debug, Clone, Copy)]
pub struct BaselineLookup {
    pub expected: f64,
    pub expected_std: f64,
    pub confidence: f64,
}

/// How an anomaly was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    RollingZScore,
    SeasonalAware,
    NewPattern,
    FrequencySpike,
    PatternTransition,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::RollingZScore => write!(f, "rolling_z_score"),
            DetectionMethod::SeasonalAware => write!(f, "seasonal_aware"),
            DetectionMethod::NewPattern => write!(f, "new_pattern"),
            DetectionMethod::FrequencySpike => write!(f, "frequency_spike"),
            DetectionMethod::PatternTransition => write!(f, "pattern_transition"),
        }
    }
}

/// Severity of an emitted anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A detected deviation, immutable once emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub service: String,
    /// Metric name or log template id, depending on the detector
    pub metric_or_pattern: String,
    pub timestamp: i64,
    pub observed: f64,
    pub expected: f64,
    pub expected_std: f64,
    pub deviation_sigma: f64,
    /// Normalized anomaly score in [0, 1]
    pub score: f64,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    pub method: DetectionMethod,
    pub severity: Severity,
}

/// A mined log template: literal tokens with wildcards for variable content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogTemplate {
    /// Stable hash of the token sequence the template was created from
    pub id: String,
    pub service: String,
    pub tokens: Vec<String>,
    pub total_count: u64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub severity_counts: SeverityCounts,
    /// Most recent raw lines matching this template, oldest dropped first
    pub sample_lines: VecDeque<String>,
    pub is_error_pattern: bool,
    pub is_rare_pattern: bool,
}

impl LogTemplate {
    /// Render the template with `<*>` wildcards, space-joined
    pub fn template_string(&self) -> String {
        self.tokens.join(" ")
    }
}

/// One matched line, derived per ingest and not retained by the miner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPatternOccurrence {
    pub template_id: String,
    pub service: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Line tokens at the template's wildcard positions
    pub extracted_variables: Vec<String>,
}

/// Kind of service level indicator an SLO is defined over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliType {
    Latency,
    ErrorRate,
    Availability,
    Throughput,
}

/// Comparison deciding whether a raw SLI observation counts as good
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliOperator {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl SliOperator {
    pub fn evaluate(&self, observed: f64, threshold: f64) -> bool {
        match self {
            SliOperator::Lt => observed < threshold,
            SliOperator::Lte => observed <= threshold,
            SliOperator::Gt => observed > threshold,
            SliOperator::Gte => observed >= threshold,
        }
    }
}

fn default_burn_rate_fast() -> f64 {
    14.4 // 2% of a 30-day budget in 1 hour
}

fn default_burn_rate_slow() -> f64 {
    6.0 // 5% of a 30-day budget in 6 hours
}

/// Externally configured service level objective, read-only to the evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SLODefinition {
    pub id: String,
    pub sli_type: SliType,
    pub threshold: f64,
    pub operator: SliOperator,
    pub target_percentage: f64,
    pub window_days: u32,
    #[serde(default = "default_burn_rate_fast")]
    pub burn_rate_fast: f64,
    #[serde(default = "default_burn_rate_slow")]
    pub burn_rate_slow: f64,
}

/// One evaluation tick's worth of SLO arithmetic, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SLOMeasurement {
    pub slo_id: String,
    pub timestamp: i64,
    pub total_count: u64,
    pub good_count: u64,
    pub bad_count: u64,
    /// Absent when the tick had no traffic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sli_value: Option<f64>,
    /// Fraction of the error budget consumed over the SLO window, may exceed 1
    pub error_budget_consumed: f64,
    pub error_budget_remaining: f64,
    pub burn_rate_1h: f64,
    pub burn_rate_6h: f64,
    pub burn_rate_24h: f64,
    pub data_insufficient: bool,
}

/// Alert state of an SLO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Ok,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Ok => write!(f, "ok"),
            AlertStatus::Warning => write!(f, "warning"),
            AlertStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Current-state row per SLO, replaced on each tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SLOStatus {
    pub slo_id: String,
    pub updated_at: i64,
    pub current_attainment: f64,
    pub error_budget_remaining_percent: f64,
    /// Unix timestamp of projected budget exhaustion at the current burn rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_exhaustion: Option<i64>,
    pub alert_status: AlertStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_counts_error_ratio() {
        let mut counts = SeverityCounts::default();
        counts.record(LogSeverity::Info);
        counts.record(LogSeverity::Error);
        counts.record(LogSeverity::Fatal);
        counts.record(LogSeverity::Warn);

        assert_eq!(counts.total(), 4);
        assert!((counts.error_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_severity_counts_empty_ratio() {
        let counts = SeverityCounts::default();
        assert_eq!(counts.error_ratio(), 0.0);
    }

    #[test]
    fn test_sli_operator_evaluate() {
        assert!(SliOperator::Lt.evaluate(499.0, 500.0));
        assert!(!SliOperator::Lt.evaluate(500.0, 500.0));
        assert!(SliOperator::Lte.evaluate(500.0, 500.0));
        assert!(SliOperator::Gte.evaluate(1.0, 1.0));
        assert!(!SliOperator::Gt.evaluate(1.0, 1.0));
    }

    #[test]
    fn test_time_range_contains() {
        let range = TimeRange::new(100, 200);
        assert!(range.contains(100));
        assert!(range.contains(199));
        assert!(!range.contains(200));
        assert!(!range.contains(99));
    }

    #[test]
    fn test_slo_definition_burn_rate_defaults() {
        let json = r#"{
            "id": "slo-1",
            "sli_type": "latency",
            "threshold": 500.0,
            "operator": "lte",
            "target_percentage": 99.9,
            "window_days": 30
        }"#;
        let def: SLODefinition = serde_json::from_str(json).unwrap();
        assert!((def.burn_rate_fast - 14.4).abs() < f64::EPSILON);
        assert!((def.burn_rate_slow - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detection_method_serialization() {
        let json = serde_json::to_string(&DetectionMethod::FrequencySpike).unwrap();
        assert_eq!(json, "\"frequency_spike\"");
    }
}
