//! Engine configuration

use anyhow::Result;
use serde::Deserialize;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Instance name used in structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics/ingest
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Baseline recompute cadence in seconds
    #[serde(default = "default_recompute_interval")]
    pub recompute_interval_secs: u64,

    /// SLO evaluation tick in seconds
    #[serde(default = "default_slo_tick")]
    pub slo_tick_secs: u64,

    /// Per-service log template cap
    #[serde(default = "default_template_cap")]
    pub template_cap: usize,

    /// Template merge similarity threshold
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f64,

    /// Per-key worker inbox capacity
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "analytics-engine".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_recompute_interval() -> u64 {
    3600
}

fn default_slo_tick() -> u64 {
    60
}

fn default_template_cap() -> usize {
    512
}

fn default_merge_threshold() -> f64 {
    0.6
}

fn default_inbox_capacity() -> usize {
    1024
}

impl EngineConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ENGINE"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| EngineConfig {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            recompute_interval_secs: default_recompute_interval(),
            slo_tick_secs: default_slo_tick(),
            template_cap: default_template_cap(),
            merge_threshold: default_merge_threshold(),
            inbox_capacity: default_inbox_capacity(),
        }))
    }
}
