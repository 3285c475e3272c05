//! Trailing sample window for rolling z-score detection
//!
//! Keeps recent (timestamp, value) pairs bounded by both age and capacity.
//! The scoring baseline is computed over a sub-range that excludes the most
//! recent interval, so the sample being scored never contaminates its own
//! baseline.

use std::collections::VecDeque;
use std::time::Duration;

use crate::stats::two_pass_stats;

/// Default trailing window duration (1 hour)
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default exclusion interval before the scored sample (5 minutes)
pub const DEFAULT_EXCLUSION: Duration = Duration::from_secs(5 * 60);

/// Minimum qualifying samples for a meaningful baseline
pub const MIN_SAMPLES_FOR_SCORING: usize = 10;

/// Hard cap on retained samples per key
const MAX_WINDOW_SAMPLES: usize = 4096;

/// Mean/std/count over the qualifying sub-window
#[derive(Debug, Clone, Copy)]
pub struct WindowStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// Bounded trailing window of recent samples for one metric key
#[derive(Debug)]
pub struct RollingWindow {
    samples: VecDeque<(i64, f64)>,
    window_secs: i64,
    exclusion_secs: i64,
}

impl RollingWindow {
    pub fn new(window: Duration, exclusion: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            window_secs: window.as_secs() as i64,
            exclusion_secs: exclusion.as_secs() as i64,
        }
    }

    /// Record a sample, evicting entries outside the window or over cap
    pub fn push(&mut self, timestamp: i64, value: f64) {
        let cutoff = timestamp - self.window_secs;
        while let Some((ts, _)) = self.samples.front() {
            if *ts < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        while self.samples.len() >= MAX_WINDOW_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((timestamp, value));
    }

    /// Baseline statistics over `[now - window, now - exclusion)`
    pub fn baseline_stats(&self, now: i64) -> WindowStats {
        let start = now - self.window_secs;
        let end = now - self.exclusion_secs;

        let values: Vec<f64> = self
            .samples
            .iter()
            .filter(|(ts, _)| *ts >= start && *ts < end)
            .map(|(_, v)| *v)
            .collect();

        let (mean, std_dev) = two_pass_stats(&values);
        WindowStats {
            count: values.len(),
            mean,
            std_dev,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_EXCLUSION)
    }
}
