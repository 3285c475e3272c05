//! SLO evaluation
//!
//! Once per tick, per active SLO definition: fold the tick's good/bad
//! counts into the rolling windows, derive the SLI, burn rates, and
//! error-budget arithmetic, advance the alert state machine, and produce
//! an append-only measurement plus the replaced current-status row.

use super::state::{AlertStateMachine, AlertThresholds, BurnRates, DEFAULT_HYSTERESIS_TICKS};
use super::window::RollingCounter;
use crate::error::EngineError;
use crate::models::{AlertStatus, SLODefinition, SLOMeasurement, SLOStatus};
use std::collections::HashMap;
use tracing::{info, warn};

const FIVE_MIN_SECS: i64 = 5 * 60;
const HOUR_SECS: i64 = 60 * 60;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Tunables for the evaluator
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub hysteresis_ticks: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            hysteresis_ticks: DEFAULT_HYSTERESIS_TICKS,
        }
    }
}

/// Everything the evaluator tracks for one SLO id
struct SloSlot {
    definition: SLODefinition,
    five_min: RollingCounter,
    one_hour: RollingCounter,
    six_hour: RollingCounter,
    twenty_four_hour: RollingCounter,
    budget_window: RollingCounter,
    fsm: AlertStateMachine,
    last_attainment: Option<f64>,
}

impl SloSlot {
    fn new(definition: SLODefinition) -> Self {
        let budget_secs = definition.window_days as i64 * DAY_SECS;
        Self {
            definition,
            five_min: RollingCounter::minutes(FIVE_MIN_SECS),
            one_hour: RollingCounter::minutes(HOUR_SECS),
            six_hour: RollingCounter::minutes(6 * HOUR_SECS),
            twenty_four_hour: RollingCounter::minutes(DAY_SECS),
            budget_window: RollingCounter::hours(budget_secs),
            fsm: AlertStateMachine::new(),
            last_attainment: None,
        }
    }
}

/// Per-SLO evaluation engine
///
/// Each SLO id is an independent unit of work: an error on one never
/// blocks evaluation of the others, and invalid definitions are excluded
/// at load time.
pub struct SloEvaluator {
    config: EvaluatorConfig,
    slots: HashMap<String, SloSlot>,
}

impl SloEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            config,
            slots: HashMap::new(),
        }
    }

    /// Load definitions, excluding any that fail validation
    pub fn load_definitions(&mut self, definitions: Vec<SLODefinition>) {
        for definition in definitions {
            match validate_definition(&definition) {
                Ok(()) => {
                    info!(slo_id = %definition.id, target = definition.target_percentage, "Loaded SLO definition");
                    self.slots
                        .entry(definition.id.clone())
                        .or_insert_with(|| SloSlot::new(definition));
                }
                Err(e) => {
                    warn!(slo_id = %definition.id, error = %e, "Rejected SLO definition");
                }
            }
        }
    }

    /// Ids of all loaded SLOs
    pub fn slo_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.slots.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Evaluate one SLO for one tick
    pub fn evaluate(
        &mut self,
        slo_id: &str,
        good_count: u64,
        bad_count: u64,
        timestamp: i64,
    ) -> Result<(SLOMeasurement, SLOStatus), EngineError> {
        let slot = self.slots.get_mut(slo_id).ok_or_else(|| {
            EngineError::invalid_configuration(format!("unknown SLO id {slo_id}"))
        })?;

        let def = &slot.definition;
        let error_budget_fraction = 1.0 - def.target_percentage / 100.0;

        slot.five_min.record(timestamp, good_count, bad_count);
        slot.one_hour.record(timestamp, good_count, bad_count);
        slot.six_hour.record(timestamp, good_count, bad_count);
        slot.twenty_four_hour.record(timestamp, good_count, bad_count);
        slot.budget_window.record(timestamp, good_count, bad_count);

        let burn = |counter: &mut RollingCounter| {
            counter.totals(timestamp).bad_fraction() / error_budget_fraction
        };
        let rates = BurnRates {
            five_min: burn(&mut slot.five_min),
            one_hour: burn(&mut slot.one_hour),
            six_hour: burn(&mut slot.six_hour),
            twenty_four_hour: burn(&mut slot.twenty_four_hour),
        };

        let budget_totals = slot.budget_window.totals(timestamp);
        let budget_consumed = budget_totals.bad_fraction() / error_budget_fraction;
        let budget_remaining = 1.0 - budget_consumed;

        let total = good_count + bad_count;
        let data_insufficient = total == 0;

        let sli_value = if data_insufficient {
            None
        } else {
            Some(good_count as f64 / total as f64)
        };

        let attainment = if budget_totals.total() > 0 {
            100.0 * budget_totals.good as f64 / budget_totals.total() as f64
        } else {
            slot.last_attainment.unwrap_or(100.0)
        };
        slot.last_attainment = Some(attainment);

        // A tick with no traffic neither fires nor clears alerts
        let alert_status = if data_insufficient {
            slot.fsm.status()
        } else {
            let thresholds = AlertThresholds {
                fast: def.burn_rate_fast,
                slow: def.burn_rate_slow,
                hysteresis_ticks: self.config.hysteresis_ticks,
            };
            let previous = slot.fsm.status();
            let next = slot.fsm.tick(&rates, &thresholds);
            if next != previous {
                info!(
                    slo_id = %slo_id,
                    from = %previous,
                    to = %next,
                    burn_rate_1h = rates.one_hour,
                    burn_rate_6h = rates.six_hour,
                    "SLO alert state changed"
                );
            }
            next
        };

        let projected_exhaustion =
            project_exhaustion(timestamp, budget_remaining, def.window_days, rates.one_hour);

        let measurement = SLOMeasurement {
            slo_id: slo_id.to_string(),
            timestamp,
            total_count: total,
            good_count,
            bad_count,
            sli_value,
            error_budget_consumed: budget_consumed,
            error_budget_remaining: budget_remaining,
            burn_rate_1h: rates.one_hour,
            burn_rate_6h: rates.six_hour,
            burn_rate_24h: rates.twenty_four_hour,
            data_insufficient,
        };

        let status = SLOStatus {
            slo_id: slo_id.to_string(),
            updated_at: timestamp,
            current_attainment: attainment,
            error_budget_remaining_percent: (budget_remaining * 100.0).clamp(0.0, 100.0),
            projected_exhaustion,
            alert_status,
        };

        Ok((measurement, status))
    }

    /// Current alert status without evaluating, if the SLO is loaded
    pub fn current_status(&self, slo_id: &str) -> Option<AlertStatus> {
        self.slots.get(slo_id).map(|slot| slot.fsm.status())
    }
}

impl Default for SloEvaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

/// Reject malformed definitions before they reach evaluation
pub fn validate_definition(def: &SLODefinition) -> Result<(), EngineError> {
    if !(def.target_percentage > 0.0 && def.target_percentage < 100.0) {
        return Err(EngineError::invalid_configuration(format!(
            "target_percentage {} must be inside (0, 100)",
            def.target_percentage
        )));
    }
    if def.window_days == 0 || def.window_days > 90 {
        return Err(EngineError::invalid_configuration(format!(
            "window_days {} must be in [1, 90]",
            def.window_days
        )));
    }
    if def.burn_rate_fast <= 0.0 || def.burn_rate_slow <= 0.0 {
        return Err(EngineError::invalid_configuration(
            "burn rate thresholds must be positive",
        ));
    }
    if !def.threshold.is_finite() {
        return Err(EngineError::invalid_configuration(
            "SLI threshold must be finite",
        ));
    }
    Ok(())
}

/// Unix timestamp when the remaining budget runs out at the current burn
/// rate, or None when nothing is burning or the budget is already gone
fn project_exhaustion(
    now: i64,
    budget_remaining: f64,
    window_days: u32,
    burn_rate: f64,
) -> Option<i64> {
    if burn_rate <= 0.0 || budget_remaining <= 0.0 {
        return None;
    }
    let window_secs = window_days as f64 * DAY_SECS as f64;
    let seconds_left = budget_remaining * window_secs / burn_rate;
    Some(now + seconds_left as i64)
}
