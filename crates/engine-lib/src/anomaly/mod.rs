//! Metric anomaly detection
//!
//! This module provides:
//! - A bounded trailing window with exclusion of the most recent interval
//! - Rolling z-score and seasonal-aware scoring with a confidence tie-break

mod detector;
mod rolling;

pub use detector::{
    severity_for_sigma, DetectorConfig, MetricAnomalyDetector, ScoringMode, CRITICAL_SIGMA,
    WARNING_SIGMA,
};
pub use rolling::{RollingWindow, WindowStats, MIN_SAMPLES_FOR_SCORING};
