//! Streaming statistics primitives
//!
//! Welford's online algorithm is used everywhere a mean/std pair is
//! accumulated incrementally: baseline buckets, per-template rate and
//! inter-arrival statistics. Population variance is used throughout so
//! online and batch recomputes agree.

use serde::{Deserialize, Serialize};

/// Online mean/variance accumulator (Welford's algorithm)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Welford {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Welford {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance; zero until at least one sample is seen
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.m2 / self.count as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Sum of squared deviations from the mean
    pub fn sum_squared_deviations(&self) -> f64 {
        self.m2
    }
}

/// Two-pass mean/std over a slice, for cross-checking the online path
pub fn two_pass_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welford_known_values() {
        let mut stats = Welford::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.push(v);
        }
        assert_eq!(stats.count(), 8);
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        assert!((stats.std_dev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_welford_matches_two_pass() {
        let values: Vec<f64> = (0..500)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.37).sin())
            .collect();

        let mut online = Welford::new();
        for v in &values {
            online.push(*v);
        }
        let (mean, std) = two_pass_stats(&values);

        assert!((online.mean() - mean).abs() < 1e-9);
        assert!((online.std_dev() - std).abs() < 1e-9);
    }

    #[test]
    fn test_welford_empty_and_single() {
        let mut stats = Welford::new();
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.std_dev(), 0.0);

        stats.push(42.0);
        assert_eq!(stats.count(), 1);
        assert!((stats.mean() - 42.0).abs() < f64::EPSILON);
        assert_eq!(stats.std_dev(), 0.0);
    }
}
