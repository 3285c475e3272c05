//! Seasonal baseline estimation and snapshot management
//!
//! This module provides:
//! - Bucketed seasonal statistics per (service, metric) key
//! - Atomic snapshot replacement for concurrent readers
//! - The periodic recompute loop with latest-tick-wins semantics

pub mod estimator;
mod scheduler;
mod store;

pub use estimator::{BaselineEstimator, EstimatorConfig, MIN_BUCKET_SAMPLES, PATTERN_STRENGTH_THRESHOLD};
pub use scheduler::{BaselineScheduler, SchedulerConfig};
pub use store::{BaselineStore, MetricKey};
