//! Seasonal baseline estimation
//!
//! Buckets historical samples by hour-of-day, day-of-week, and
//! hour-of-week, accumulating mean/std per bucket with Welford's online
//! algorithm. Seasonality strength per granularity is the ratio of
//! between-bucket variance to total variance; a granularity counts as a
//! detected pattern when its strength clears a fixed threshold and the
//! history spans at least two full cycles.

use crate::models::{BaselineLookup, SeasonalBaseline, SeasonalPeriod};
use crate::stats::Welford;
use chrono::{Datelike, TimeZone, Timelike, Utc};

/// Strength above which a granularity counts as a pattern
pub const PATTERN_STRENGTH_THRESHOLD: f64 = 0.3;

/// Buckets with fewer samples fall back to global statistics
pub const MIN_BUCKET_SAMPLES: u64 = 5;

/// Bucket sample count at which lookup confidence saturates
const CONFIDENCE_FULL_SAMPLES: u64 = 20;

/// Confidence ceiling applied when a lookup fell back to global stats
const LOW_CONFIDENCE_CEILING: f64 = 0.5;

const DAY_SECS: i64 = 24 * 60 * 60;
const WEEK_SECS: i64 = 7 * DAY_SECS;

/// Configuration for baseline recomputation
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub strength_threshold: f64,
    pub min_bucket_samples: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            strength_threshold: PATTERN_STRENGTH_THRESHOLD,
            min_bucket_samples: MIN_BUCKET_SAMPLES,
        }
    }
}

/// Recomputes per-key seasonal baselines from sample history
#[derive(Debug, Clone, Default)]
pub struct BaselineEstimator {
    config: EstimatorConfig,
}

impl BaselineEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Build a baseline from historical samples of one (service, metric) key.
    ///
    /// `samples` is (timestamp, value) in any order. Insufficient history
    /// yields a degraded baseline with no detected patterns, never an error.
    pub fn recompute(
        &self,
        service: &str,
        metric: &str,
        samples: &[(i64, f64)],
        computed_at: i64,
        valid_for_secs: i64,
    ) -> SeasonalBaseline {
        let mut hourly = vec![Welford::new(); 24];
        let mut daily = vec![Welford::new(); 7];
        let mut weekly = vec![Welford::new(); 168];
        let mut global = Welford::new();

        let mut min_ts = i64::MAX;
        let mut max_ts = i64::MIN;

        for &(ts, value) in samples {
            let Some(dt) = Utc.timestamp_opt(ts, 0).single() else {
                continue;
            };
            let hour = dt.hour() as usize;
            let day = dt.weekday().num_days_from_monday() as usize;
            let week_idx = day * 24 + hour;

            hourly[hour].push(value);
            daily[day].push(value);
            weekly[week_idx].push(value);
            global.push(value);

            min_ts = min_ts.min(ts);
            max_ts = max_ts.max(ts);
        }

        let span = if global.count() > 0 { max_ts - min_ts } else { 0 };

        let hourly_strength = bucket_strength(&hourly, &global);
        let daily_strength = bucket_strength(&daily, &global);
        let weekly_strength = bucket_strength(&weekly, &global);

        // A pattern needs at least two full cycles of history to be trusted:
        // two days for the hour-of-day cycle, two weeks for the others.
        let has_hourly =
            span >= 2 * DAY_SECS && hourly_strength > self.config.strength_threshold;
        let has_daily =
            span >= 2 * WEEK_SECS && daily_strength > self.config.strength_threshold;
        let has_weekly =
            span >= 2 * WEEK_SECS && weekly_strength > self.config.strength_threshold;

        let dominant_period = dominant_period(
            (has_hourly, hourly_strength),
            (has_daily, daily_strength),
            (has_weekly, weekly_strength),
        );

        let (hourly_means, hourly_stds, hourly_counts) = bucket_arrays(&hourly);
        let (daily_means, daily_stds, daily_counts) = bucket_arrays(&daily);
        let (weekly_means, weekly_stds, weekly_counts) = bucket_arrays(&weekly);

        SeasonalBaseline {
            service: service.to_string(),
            metric: metric.to_string(),
            hourly_means,
            hourly_stds,
            hourly_counts,
            daily_means,
            daily_stds,
            daily_counts,
            weekly_means,
            weekly_stds,
            weekly_counts,
            global_mean: global.mean(),
            global_std: global.std_dev(),
            has_hourly_pattern: has_hourly,
            has_daily_pattern: has_daily,
            has_weekly_pattern: has_weekly,
            hourly_strength,
            daily_strength,
            weekly_strength,
            dominant_period,
            valid_from: computed_at,
            valid_to: computed_at + valid_for_secs,
            sample_count: global.count(),
        }
    }

    /// Expected value, spread, and confidence at a timestamp.
    ///
    /// Uses the dominant granularity's bucket; buckets below the minimum
    /// sample count fall back to global statistics with capped confidence.
    /// A baseline with no detected patterns answers with global stats at
    /// zero confidence.
    pub fn lookup(&self, baseline: &SeasonalBaseline, timestamp: i64) -> BaselineLookup {
        let Some(period) = baseline.dominant_period else {
            return BaselineLookup {
                expected: baseline.global_mean,
                expected_std: baseline.global_std,
                confidence: 0.0,
            };
        };

        let Some(dt) = Utc.timestamp_opt(timestamp, 0).single() else {
            return BaselineLookup {
                expected: baseline.global_mean,
                expected_std: baseline.global_std,
                confidence: 0.0,
            };
        };

        let hour = dt.hour() as usize;
        let day = dt.weekday().num_days_from_monday() as usize;

        let (mean, std, count) = match period {
            SeasonalPeriod::Hourly => (
                baseline.hourly_means[hour],
                baseline.hourly_stds[hour],
                baseline.hourly_counts[hour],
            ),
            SeasonalPeriod::Daily => (
                baseline.daily_means[day],
                baseline.daily_stds[day],
                baseline.daily_counts[day],
            ),
            SeasonalPeriod::Weekly => {
                let idx = day * 24 + hour;
                (
                    baseline.weekly_means[idx],
                    baseline.weekly_stds[idx],
                    baseline.weekly_counts[idx],
                )
            }
        };

        let mut confidence = (count as f64 / CONFIDENCE_FULL_SAMPLES as f64).min(1.0);

        if count < self.config.min_bucket_samples {
            confidence = confidence.min(LOW_CONFIDENCE_CEILING);
            return BaselineLookup {
                expected: baseline.global_mean,
                expected_std: baseline.global_std,
                confidence,
            };
        }

        BaselineLookup {
            expected: mean,
            expected_std: std,
            confidence,
        }
    }
}

/// Ratio of between-bucket variance to total variance, clipped to [0, 1]
fn bucket_strength(buckets: &[Welford], global: &Welford) -> f64 {
    let total = global.sum_squared_deviations();
    if total <= f64::EPSILON {
        return 0.0;
    }

    let between: f64 = buckets
        .iter()
        .filter(|b| b.count() > 0)
        .map(|b| b.count() as f64 * (b.mean() - global.mean()).powi(2))
        .sum();

    (between / total).clamp(0.0, 1.0)
}

/// Highest-strength granularity among those present, finer wins ties
fn dominant_period(
    hourly: (bool, f64),
    daily: (bool, f64),
    weekly: (bool, f64),
) -> Option<SeasonalPeriod> {
    let candidates = [
        (SeasonalPeriod::Hourly, hourly),
        (SeasonalPeriod::Daily, daily),
        (SeasonalPeriod::Weekly, weekly),
    ];

    let mut best: Option<(SeasonalPeriod, f64)> = None;
    for (period, (present, strength)) in candidates {
        if !present {
            continue;
        }
        match best {
            Some((_, best_strength)) if strength <= best_strength => {}
            _ => best = Some((period, strength)),
        }
    }
    best.map(|(period, _)| period)
}

fn bucket_arrays(buckets: &[Welford]) -> (Vec<f64>, Vec<f64>, Vec<u64>) {
    let means = buckets.iter().map(|b| b.mean()).collect();
    let stds = buckets.iter().map(|b| b.std_dev()).collect();
    let counts = buckets.iter().map(|b| b.count()).collect();
    (means, stds, counts)
}
