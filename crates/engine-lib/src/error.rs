//! Typed errors for the analytics engine
//!
//! Every error is local to a single key's processing unit. Nothing here is
//! fatal to the process: callers degrade, retry, or skip the affected key
//! and keep the last good state.

use thiserror::Error;

/// Errors produced by the analytics engine components
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Too few samples or buckets to produce a reliable result.
    /// Degrades confidence, never aborts a pipeline.
    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    /// A storage read timed out or failed after bounded retries.
    /// The current tick is skipped and stale data is flagged.
    #[error("storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// A malformed SLO definition or threshold, rejected at load time.
    /// The offending SLO is excluded from evaluation until fixed.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// A template or queue cap was hit. Handled by eviction/drop policies,
    /// surfaced for operators, never propagated as a failure.
    #[error("capacity exceeded: {reason}")]
    CapacityExceeded { reason: String },
}

impl EngineError {
    pub fn insufficient_data(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }

    pub fn storage_unavailable(reason: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn capacity_exceeded(reason: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            reason: reason.into(),
        }
    }

    /// Whether a retry can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StorageUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_errors_are_retryable() {
        assert!(EngineError::storage_unavailable("timeout").is_retryable());
        assert!(!EngineError::insufficient_data("3 samples").is_retryable());
        assert!(!EngineError::invalid_configuration("target=0").is_retryable());
        assert!(!EngineError::capacity_exceeded("template cap").is_retryable());
    }

    #[test]
    fn test_display_includes_reason() {
        let err = EngineError::storage_unavailable("connection refused");
        assert_eq!(err.to_string(), "storage unavailable: connection refused");
    }
}
