//! Pattern anomaly sub-detectors
//!
//! Evaluated after every ingest against the matched template:
//! - `new_pattern`: the line created a brand-new template
//! - `frequency_spike`: the current per-minute rate exceeds the template's
//!   own historical rate by more than four standard deviations
//! - `pattern_transition`: the gap since the template's prior occurrence
//!   deviates from its historical inter-arrival statistics by more than
//!   four standard deviations

use crate::models::{AnomalyEvent, DetectionMethod, LogTemplate, Severity};
use crate::stats::Welford;
use std::collections::HashMap;

/// Sigma cutoff shared by the spike and transition detectors
pub const PATTERN_SIGMA_THRESHOLD: f64 = 4.0;

/// Completed minutes of history required before spike detection
const MIN_RATE_MINUTES: u64 = 10;

/// Recorded gaps required before transition detection
const MIN_GAP_SAMPLES: u64 = 10;

/// Score assigned to brand-new templates
const NEW_PATTERN_SCORE: f64 = 0.8;

/// History size at which sub-detector confidence saturates
const CONFIDENCE_FULL_SAMPLES: u64 = 60;

/// Tunables for the pattern sub-detectors
#[derive(Debug, Clone)]
pub struct PatternConfig {
    pub sigma_threshold: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            sigma_threshold: PATTERN_SIGMA_THRESHOLD,
        }
    }
}

/// Rolling activity state for one template
#[derive(Debug, Default)]
struct TemplateActivity {
    /// Start of the minute currently being counted
    minute_start: i64,
    /// Occurrences in the current minute
    minute_count: u64,
    /// Statistics over completed per-minute counts
    rate_stats: Welford,
    /// Whether a spike already fired for the current minute
    spike_fired: bool,
    last_seen: Option<i64>,
    /// Statistics over inter-arrival gaps in seconds
    gap_stats: Welford,
}

/// Per-service pattern anomaly detector, owned by the service's worker
pub struct PatternMonitor {
    service: String,
    config: PatternConfig,
    activity: HashMap<String, TemplateActivity>,
}

impl PatternMonitor {
    pub fn new(service: impl Into<String>, config: PatternConfig) -> Self {
        Self {
            service: service.into(),
            config,
            activity: HashMap::new(),
        }
    }

    /// Record one occurrence of a template and check the sub-detectors
    pub fn observe(
        &mut self,
        template: &LogTemplate,
        created: bool,
        timestamp: i64,
    ) -> Vec<AnomalyEvent> {
        let mut events = Vec::new();

        if created {
            events.push(self.new_pattern_event(template, timestamp));
        }

        let activity = self.activity.entry(template.id.clone()).or_default();

        // Roll the per-minute rate window forward, folding every completed
        // minute (including empty gaps) into the historical statistics
        let minute = timestamp - timestamp.rem_euclid(60);
        if activity.minute_start == 0 && activity.rate_stats.count() == 0 && activity.minute_count == 0 {
            activity.minute_start = minute;
        } else if minute > activity.minute_start {
            activity.rate_stats.push(activity.minute_count as f64);
            let mut empty_minutes = (minute - activity.minute_start) / 60 - 1;
            // Cap the backfill so a long-idle template cannot stall ingest
            empty_minutes = empty_minutes.min(1440);
            for _ in 0..empty_minutes {
                activity.rate_stats.push(0.0);
            }
            activity.minute_start = minute;
            activity.minute_count = 0;
            activity.spike_fired = false;
        }
        activity.minute_count += 1;

        if !created {
            if let Some(event) =
                frequency_spike_event(&self.service, template, activity, timestamp, &self.config)
            {
                activity.spike_fired = true;
                events.push(event);
            }

            if let Some(last_seen) = activity.last_seen {
                let gap = (timestamp - last_seen) as f64;
                if let Some(event) =
                    transition_event(&self.service, template, activity, gap, timestamp, &self.config)
                {
                    events.push(event);
                }
                activity.gap_stats.push(gap);
            }
        }
        activity.last_seen = Some(timestamp);

        events
    }

    fn new_pattern_event(&self, template: &LogTemplate, timestamp: i64) -> AnomalyEvent {
        AnomalyEvent {
            service: self.service.clone(),
            metric_or_pattern: template.id.clone(),
            timestamp,
            observed: 1.0,
            expected: 0.0,
            expected_std: 0.0,
            deviation_sigma: 0.0,
            score: NEW_PATTERN_SCORE,
            confidence: 1.0,
            method: DetectionMethod::NewPattern,
            severity: Severity::Warning,
        }
    }
}

/// Fires when the in-progress minute count crosses `mean + sigma * std` of
/// the template's historical per-minute rate, once per minute
fn frequency_spike_event(
    service: &str,
    template: &LogTemplate,
    activity: &TemplateActivity,
    timestamp: i64,
    config: &PatternConfig,
) -> Option<AnomalyEvent> {
    if activity.spike_fired || activity.rate_stats.count() < MIN_RATE_MINUTES {
        return None;
    }

    let mean = activity.rate_stats.mean();
    let std = activity.rate_stats.std_dev();
    if std <= f64::EPSILON {
        return None;
    }

    let observed = activity.minute_count as f64;
    let threshold = mean + config.sigma_threshold * std;
    if observed <= threshold {
        return None;
    }

    let sigma = (observed - mean) / std;
    Some(AnomalyEvent {
        service: service.to_string(),
        metric_or_pattern: template.id.clone(),
        timestamp,
        observed,
        expected: mean,
        expected_std: std,
        deviation_sigma: sigma,
        score: (sigma.abs() / 6.0).min(1.0),
        confidence: (activity.rate_stats.count() as f64 / CONFIDENCE_FULL_SAMPLES as f64).min(1.0),
        method: DetectionMethod::FrequencySpike,
        severity: Severity::Critical,
    })
}

/// Fires when the gap since the prior occurrence deviates from the
/// template's inter-arrival statistics by more than the sigma cutoff
fn transition_event(
    service: &str,
    template: &LogTemplate,
    activity: &TemplateActivity,
    gap: f64,
    timestamp: i64,
    config: &PatternConfig,
) -> Option<AnomalyEvent> {
    if activity.gap_stats.count() < MIN_GAP_SAMPLES {
        return None;
    }

    let mean = activity.gap_stats.mean();
    let std = activity.gap_stats.std_dev();
    if std <= f64::EPSILON {
        return None;
    }

    let sigma = (gap - mean) / std;
    if sigma.abs() <= config.sigma_threshold {
        return None;
    }

    Some(AnomalyEvent {
        service: service.to_string(),
        metric_or_pattern: template.id.clone(),
        timestamp,
        observed: gap,
        expected: mean,
        expected_std: std,
        deviation_sigma: sigma,
        score: (sigma.abs() / 6.0).min(1.0),
        confidence: (activity.gap_stats.count() as f64 / CONFIDENCE_FULL_SAMPLES as f64).min(1.0),
        method: DetectionMethod::PatternTransition,
        severity: Severity::Warning,
    })
}
