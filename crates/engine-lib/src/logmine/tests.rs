//! Tests for template mining and pattern anomaly detection

use super::miner::{MineOutcome, MinerConfig, TemplateMiner};
use super::pattern::{PatternConfig, PatternMonitor};
use crate::models::{DetectionMethod, LogSeverity};

fn ingest(miner: &mut TemplateMiner, ts: i64, body: &str) -> MineOutcome {
    miner.ingest(ts, LogSeverity::Info, body, None)
}

#[test]
fn test_similar_lines_merge_with_wildcard() {
    let mut miner = TemplateMiner::new("auth", MinerConfig::default());

    let first = ingest(&mut miner, 100, "User 123 logged in");
    let second = ingest(&mut miner, 160, "User 456 logged in");

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.template_id, second.template_id);

    let template = miner.template(&first.template_id).unwrap();
    assert_eq!(template.template_string(), "User <*> logged in");
    assert_eq!(template.total_count, 2);
    assert_eq!(second.occurrence.extracted_variables, vec!["456"]);
}

#[test]
fn test_unrelated_line_creates_new_template() {
    let mut miner = TemplateMiner::new("auth", MinerConfig::default());

    ingest(&mut miner, 100, "User 123 logged in");
    ingest(&mut miner, 160, "User 456 logged in");
    let third = ingest(&mut miner, 220, "Disk full on node7");

    assert!(third.created);
    assert_eq!(miner.template_count(), 2);
}

#[test]
fn test_replay_is_deterministic() {
    let lines = [
        "User 123 logged in",
        "User 456 logged in",
        "Disk full on node7",
        "Request to /api/orders took 231 ms",
        "Request to /api/users took 18 ms",
        "User 789 logged in",
        "Disk full on node3",
    ];

    let mine_all = || {
        let mut miner = TemplateMiner::new("auth", MinerConfig::default());
        let mut ids = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            ids.push(ingest(&mut miner, i as i64 * 30, line).template_id);
        }
        let mut counts: Vec<(String, u64)> = miner
            .templates()
            .map(|t| (t.id.clone(), t.total_count))
            .collect();
        counts.sort();
        (ids, counts)
    };

    assert_eq!(mine_all(), mine_all());
}

#[test]
fn test_replay_is_deterministic_across_evictions() {
    let lines = [
        "alpha started",
        "beta stopped now",
        "gamma restarted again quickly",
        "alpha started",
        "delta checkpoint written to disk",
        "beta stopped now",
    ];

    let mine_all = || {
        let config = MinerConfig {
            template_cap: 2,
            ..Default::default()
        };
        let mut miner = TemplateMiner::new("jobs", config);
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let outcome = ingest(&mut miner, i as i64 * 30, line);
                (outcome.template_id, outcome.created, outcome.evicted)
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(mine_all(), mine_all());
}

#[test]
fn test_severity_histogram_and_error_flag() {
    let mut miner = TemplateMiner::new("payments", MinerConfig::default());

    miner.ingest(100, LogSeverity::Error, "charge failed for order 1", None);
    miner.ingest(160, LogSeverity::Error, "charge failed for order 2", None);
    let outcome = miner.ingest(220, LogSeverity::Info, "charge failed for order 3", None);

    let template = miner.template(&outcome.template_id).unwrap();
    assert_eq!(template.severity_counts.error, 2);
    assert_eq!(template.severity_counts.info, 1);
    assert!(template.is_error_pattern);
    assert!(template.is_rare_pattern);
}

#[test]
fn test_sample_lines_are_bounded() {
    let config = MinerConfig {
        sample_capacity: 2,
        ..Default::default()
    };
    let mut miner = TemplateMiner::new("auth", config);

    for i in 0..5 {
        ingest(&mut miner, i * 60, &format!("User {} logged in", i));
    }

    let outcome = ingest(&mut miner, 360, "User 99 logged in");
    let template = miner.template(&outcome.template_id).unwrap();
    assert_eq!(template.sample_lines.len(), 2);
    assert_eq!(template.sample_lines[1], "User 99 logged in");
}

#[test]
fn test_cap_evicts_least_recently_seen() {
    let config = MinerConfig {
        template_cap: 2,
        ..Default::default()
    };
    let mut miner = TemplateMiner::new("auth", config);

    let oldest = ingest(&mut miner, 100, "alpha started");
    ingest(&mut miner, 200, "beta stopped now");
    let third = ingest(&mut miner, 300, "gamma restarted again quickly");

    assert_eq!(third.evicted, Some(oldest.template_id.clone()));
    assert_eq!(miner.template_count(), 2);
    assert!(miner.template(&oldest.template_id).is_none());
}

#[test]
fn test_exact_match_extracts_wildcard_variables() {
    let mut miner = TemplateMiner::new("auth", MinerConfig::default());

    ingest(&mut miner, 100, "User 123 logged in");
    ingest(&mut miner, 160, "User 456 logged in");
    let third = ingest(&mut miner, 220, "User 789 logged in");

    assert_eq!(third.occurrence.extracted_variables, vec!["789"]);
}

#[test]
fn test_new_pattern_event_emitted_on_creation() {
    let mut miner = TemplateMiner::new("auth", MinerConfig::default());
    let mut monitor = PatternMonitor::new("auth", PatternConfig::default());

    let outcome = ingest(&mut miner, 100, "Disk full on node7");
    let template = miner.template(&outcome.template_id).unwrap();
    let events = monitor.observe(template, outcome.created, 100);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].method, DetectionMethod::NewPattern);
    assert_eq!(events[0].metric_or_pattern, outcome.template_id);
}

#[test]
fn test_frequency_spike_detection() {
    let mut miner = TemplateMiner::new("auth", MinerConfig::default());
    let mut monitor = PatternMonitor::new("auth", PatternConfig::default());

    // Twenty minutes of background rate: alternating 1 and 3 lines/minute
    let mut spike_events = 0;
    for minute in 0..20i64 {
        let per_minute = if minute % 2 == 0 { 1 } else { 3 };
        for i in 0..per_minute {
            let ts = minute * 60 + i * 5;
            let outcome = ingest(&mut miner, ts, "User 123 logged in");
            let template = miner.template(&outcome.template_id).unwrap();
            spike_events += monitor
                .observe(template, outcome.created, ts)
                .iter()
                .filter(|e| e.method == DetectionMethod::FrequencySpike)
                .count();
        }
    }
    assert_eq!(spike_events, 0);

    // A burst far above mean + 4 sigma fires exactly once for the minute
    for i in 0..30 {
        let ts = 20 * 60 + i;
        let outcome = ingest(&mut miner, ts, "User 123 logged in");
        let template = miner.template(&outcome.template_id).unwrap();
        spike_events += monitor
            .observe(template, outcome.created, ts)
            .iter()
            .filter(|e| e.method == DetectionMethod::FrequencySpike)
            .count();
    }
    assert_eq!(spike_events, 1);
}

#[test]
fn test_pattern_transition_detection() {
    let mut miner = TemplateMiner::new("batch", MinerConfig::default());
    let mut monitor = PatternMonitor::new("batch", PatternConfig::default());

    // A heartbeat with slight jitter every ~60s
    let mut ts = 0i64;
    let mut transition_events = 0;
    for i in 0..20 {
        ts += 60 + (i % 3) - 1;
        let outcome = ingest(&mut miner, ts, "heartbeat tick ok");
        let template = miner.template(&outcome.template_id).unwrap();
        transition_events += monitor
            .observe(template, outcome.created, ts)
            .iter()
            .filter(|e| e.method == DetectionMethod::PatternTransition)
            .count();
    }
    assert_eq!(transition_events, 0);

    // A multi-hour silence breaks the cadence
    ts += 4 * 3600;
    let outcome = ingest(&mut miner, ts, "heartbeat tick ok");
    let template = miner.template(&outcome.template_id).unwrap();
    let events = monitor.observe(template, outcome.created, ts);

    assert!(events
        .iter()
        .any(|e| e.method == DetectionMethod::PatternTransition));
}

#[test]
fn test_empty_body_gets_a_template() {
    let mut miner = TemplateMiner::new("auth", MinerConfig::default());
    let outcome = ingest(&mut miner, 100, "   ");
    assert!(outcome.created);
    assert_eq!(
        miner.template(&outcome.template_id).unwrap().template_string(),
        "<empty>"
    );
}
