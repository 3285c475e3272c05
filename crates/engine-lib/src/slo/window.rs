//! Rolling good/bad counters for burn-rate windows
//!
//! Counts are bucketed by time and pruned lazily on read, so each SLO
//! holds a small bounded amount of state per window regardless of
//! traffic volume.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct Bucket {
    start: i64,
    good: u64,
    bad: u64,
}

/// Good/bad totals over one rolling window
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowTotals {
    pub good: u64,
    pub bad: u64,
}

impl WindowTotals {
    pub fn total(&self) -> u64 {
        self.good + self.bad
    }

    /// Fraction of bad events, zero when the window is empty
    pub fn bad_fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.bad as f64 / total as f64
    }
}

/// Time-bucketed rolling counter of good/bad events
#[derive(Debug, Clone)]
pub struct RollingCounter {
    buckets: VecDeque<Bucket>,
    window_secs: i64,
    bucket_secs: i64,
}

impl RollingCounter {
    pub fn new(window_secs: i64, bucket_secs: i64) -> Self {
        Self {
            buckets: VecDeque::new(),
            window_secs,
            bucket_secs,
        }
    }

    /// Minute-bucketed counter for burn-rate windows
    pub fn minutes(window_secs: i64) -> Self {
        Self::new(window_secs, 60)
    }

    /// Hour-bucketed counter for multi-day budget windows
    pub fn hours(window_secs: i64) -> Self {
        Self::new(window_secs, 3600)
    }

    /// Record counts at a timestamp
    pub fn record(&mut self, timestamp: i64, good: u64, bad: u64) {
        let start = timestamp - timestamp.rem_euclid(self.bucket_secs);
        match self.buckets.back_mut() {
            Some(bucket) if bucket.start == start => {
                bucket.good += good;
                bucket.bad += bad;
            }
            _ => {
                self.buckets.push_back(Bucket { start, good, bad });
            }
        }
        self.prune(timestamp);
    }

    /// Totals over the window ending at `now`
    pub fn totals(&mut self, now: i64) -> WindowTotals {
        self.prune(now);
        let mut totals = WindowTotals::default();
        for bucket in &self.buckets {
            totals.good += bucket.good;
            totals.bad += bucket.bad;
        }
        totals
    }

    fn prune(&mut self, now: i64) {
        let cutoff = now - self.window_secs;
        while let Some(front) = self.buckets.front() {
            if front.start + self.bucket_secs <= cutoff {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }
}
