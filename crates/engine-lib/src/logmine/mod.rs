//! Log template mining
//!
//! This module provides:
//! - Tokenization and stable content-derived template ids
//! - Per-service incremental clustering with wildcard merging and
//!   least-recently-seen eviction
//! - Pattern anomaly sub-detectors (new pattern, frequency spike,
//!   transition gap)

mod miner;
mod pattern;
pub mod tokenize;

#[cfg(test)]
mod tests;

pub use miner::{
    MineOutcome, MinerConfig, TemplateMiner, DEFAULT_MERGE_THRESHOLD, DEFAULT_SAMPLE_CAPACITY,
    DEFAULT_TEMPLATE_CAP,
};
pub use pattern::{PatternConfig, PatternMonitor, PATTERN_SIGMA_THRESHOLD};
