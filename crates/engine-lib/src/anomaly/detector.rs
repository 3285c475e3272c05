//! Metric anomaly scoring
//!
//! Two interchangeable scoring modes per metric:
//! - Rolling z-score against a short trailing window
//! - Seasonal-aware deviation against the latest baseline snapshot
//!
//! When both modes fire for the same sample, the seasonal-aware result
//! wins if its confidence is at least the rolling result's.

use super::rolling::{RollingWindow, MIN_SAMPLES_FOR_SCORING};
use crate::baseline::BaselineEstimator;
use crate::models::{AnomalyEvent, DetectionMethod, SeasonalBaseline, Severity};
use std::time::Duration;

/// Z-score magnitude above which an event is warning severity
pub const WARNING_SIGMA: f64 = 3.0;

/// Z-score magnitude above which an event is critical severity
pub const CRITICAL_SIGMA: f64 = 4.0;

/// Deviation magnitude at which the anomaly score saturates at 1.0
const SCORE_SATURATION_SIGMA: f64 = 6.0;

/// Window sample count at which rolling confidence saturates
const ROLLING_CONFIDENCE_FULL_SAMPLES: usize = 60;

/// Scoring mode for one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    RollingZScore,
    SeasonalAware,
    /// Run both and resolve with the confidence tie-break
    #[default]
    Both,
}

/// Tunables for metric anomaly detection
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub mode: ScoringMode,
    pub warning_sigma: f64,
    pub critical_sigma: f64,
    pub window: Duration,
    pub exclusion: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::default(),
            warning_sigma: WARNING_SIGMA,
            critical_sigma: CRITICAL_SIGMA,
            window: super::rolling::DEFAULT_WINDOW,
            exclusion: super::rolling::DEFAULT_EXCLUSION,
        }
    }
}

/// Maps a deviation magnitude to a severity, or none below the cutoffs
pub fn severity_for_sigma(sigma: f64, config: &DetectorConfig) -> Option<Severity> {
    let magnitude = sigma.abs();
    if magnitude > config.critical_sigma {
        Some(Severity::Critical)
    } else if magnitude > config.warning_sigma {
        Some(Severity::Warning)
    } else {
        None
    }
}

/// Normalized anomaly score in [0, 1]
fn score_for_sigma(sigma: f64) -> f64 {
    (sigma.abs() / SCORE_SATURATION_SIGMA).min(1.0)
}

/// Stateful detector for one (service, metric) key
///
/// The only cross-call state is the bounded trailing window; everything
/// else is derived per sample from the latest baseline snapshot.
pub struct MetricAnomalyDetector {
    service: String,
    metric: String,
    config: DetectorConfig,
    window: RollingWindow,
    estimator: BaselineEstimator,
}

impl MetricAnomalyDetector {
    pub fn new(service: impl Into<String>, metric: impl Into<String>, config: DetectorConfig) -> Self {
        let window = RollingWindow::new(config.window, config.exclusion);
        Self {
            service: service.into(),
            metric: metric.into(),
            config,
            window,
            estimator: BaselineEstimator::default(),
        }
    }

    /// Score one observation. Returns an event only when the deviation
    /// clears the warning cutoff in at least one enabled mode.
    pub fn score(
        &mut self,
        value: f64,
        timestamp: i64,
        baseline: Option<&SeasonalBaseline>,
    ) -> Option<AnomalyEvent> {
        let rolling = match self.config.mode {
            ScoringMode::SeasonalAware => None,
            _ => self.score_rolling(value, timestamp),
        };
        let seasonal = match self.config.mode {
            ScoringMode::RollingZScore => None,
            _ => baseline.and_then(|b| self.score_seasonal(value, timestamp, b)),
        };

        self.window.push(timestamp, value);

        match (seasonal, rolling) {
            (Some(s), Some(r)) => {
                if s.confidence >= r.confidence {
                    Some(s)
                } else {
                    Some(r)
                }
            }
            (Some(s), None) => Some(s),
            (None, Some(r)) => Some(r),
            (None, None) => None,
        }
    }

    fn score_rolling(&self, value: f64, timestamp: i64) -> Option<AnomalyEvent> {
        let stats = self.window.baseline_stats(timestamp);
        if stats.count < MIN_SAMPLES_FOR_SCORING {
            return None;
        }

        // Zero spread means no meaningful z-score, not a division error
        let z = if stats.std_dev > f64::EPSILON {
            (value - stats.mean) / stats.std_dev
        } else {
            0.0
        };

        let severity = severity_for_sigma(z, &self.config)?;
        let confidence =
            (stats.count as f64 / ROLLING_CONFIDENCE_FULL_SAMPLES as f64).min(1.0);

        Some(AnomalyEvent {
            service: self.service.clone(),
            metric_or_pattern: self.metric.clone(),
            timestamp,
            observed: value,
            expected: stats.mean,
            expected_std: stats.std_dev,
            deviation_sigma: z,
            score: score_for_sigma(z),
            confidence,
            method: DetectionMethod::RollingZScore,
            severity,
        })
    }

    fn score_seasonal(
        &self,
        value: f64,
        timestamp: i64,
        baseline: &SeasonalBaseline,
    ) -> Option<AnomalyEvent> {
        let lookup = self.estimator.lookup(baseline, timestamp);

        let sigma = if lookup.expected_std > f64::EPSILON {
            (value - lookup.expected) / lookup.expected_std
        } else {
            0.0
        };

        let severity = severity_for_sigma(sigma, &self.config)?;

        Some(AnomalyEvent {
            service: self.service.clone(),
            metric_or_pattern: self.metric.clone(),
            timestamp,
            observed: value,
            expected: lookup.expected,
            expected_std: lookup.expected_std,
            deviation_sigma: sigma,
            score: score_for_sigma(sigma),
            confidence: lookup.confidence,
            method: DetectionMethod::SeasonalAware,
            severity,
        })
    }
}
