//! Analytics core for the telemetry platform
//!
//! This crate provides the compute engine behind anomaly detection and
//! SLO alerting:
//! - Seasonal baseline estimation per (service, metric) key
//! - Rolling z-score and seasonal-aware anomaly scoring
//! - Incremental log template mining with pattern sub-detectors
//! - SLO burn-rate evaluation with hysteresis alerting
//! - Per-key worker runtime, storage/sink boundaries, health and
//!   observability infrastructure

pub mod anomaly;
pub mod baseline;
pub mod error;
pub mod health;
pub mod logmine;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod sink;
pub mod slo;
pub mod stats;
pub mod storage;
pub mod worker;

pub use error::EngineError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
