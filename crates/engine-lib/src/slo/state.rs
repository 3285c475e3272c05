//! Burn-rate alert state machine
//!
//! Multi-window, multi-burn-rate alerting: a fast burn fires critical only
//! when a short corroboration window agrees, a slow burn fires warning
//! only when the day-scale window corroborates at half the slow threshold.
//! Recovery to OK requires a configurable number of consecutive ticks
//! below the respective long-window threshold, which suppresses flapping.
//!
//! Transitions are pure functions of (state, burn rates, thresholds) so
//! the machine is testable with plain tick injection.

use crate::models::AlertStatus;

/// Consecutive below-threshold ticks required to clear an alert
pub const DEFAULT_HYSTERESIS_TICKS: u32 = 3;

/// Burn rates for the windows the state machine inspects
#[derive(Debug, Clone, Copy, Default)]
pub struct BurnRates {
    /// Short corroboration window (e.g. 5 minutes)
    pub five_min: f64,
    pub one_hour: f64,
    pub six_hour: f64,
    pub twenty_four_hour: f64,
}

/// Thresholds from the SLO definition plus the hysteresis depth
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    pub fast: f64,
    pub slow: f64,
    pub hysteresis_ticks: u32,
}

/// Alert state plus the consecutive-clear counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertState {
    pub status: AlertStatus,
    pub clear_streak: u32,
}

impl Default for AlertState {
    fn default() -> Self {
        Self {
            status: AlertStatus::Ok,
            clear_streak: 0,
        }
    }
}

/// Pure transition function: one evaluation tick
pub fn next_state(state: AlertState, rates: &BurnRates, thresholds: &AlertThresholds) -> AlertState {
    let fast_firing = rates.one_hour > thresholds.fast && rates.five_min > thresholds.fast;
    let slow_firing =
        rates.six_hour > thresholds.slow && rates.twenty_four_hour > thresholds.slow * 0.5;

    match state.status {
        AlertStatus::Ok => {
            if fast_firing {
                AlertState {
                    status: AlertStatus::Critical,
                    clear_streak: 0,
                }
            } else if slow_firing {
                AlertState {
                    status: AlertStatus::Warning,
                    clear_streak: 0,
                }
            } else {
                AlertState::default()
            }
        }
        AlertStatus::Critical => {
            if rates.one_hour > thresholds.fast {
                AlertState {
                    status: AlertStatus::Critical,
                    clear_streak: 0,
                }
            } else {
                clear_or_hold(AlertStatus::Critical, state.clear_streak, thresholds)
            }
        }
        AlertStatus::Warning => {
            if fast_firing {
                // Escalation takes the same two-window corroboration as
                // firing from OK
                AlertState {
                    status: AlertStatus::Critical,
                    clear_streak: 0,
                }
            } else if rates.six_hour > thresholds.slow {
                AlertState {
                    status: AlertStatus::Warning,
                    clear_streak: 0,
                }
            } else {
                clear_or_hold(AlertStatus::Warning, state.clear_streak, thresholds)
            }
        }
    }
}

fn clear_or_hold(current: AlertStatus, streak: u32, thresholds: &AlertThresholds) -> AlertState {
    let streak = streak + 1;
    if streak >= thresholds.hysteresis_ticks {
        AlertState::default()
    } else {
        AlertState {
            status: current,
            clear_streak: streak,
        }
    }
}

/// Stateful wrapper owned by one SLO's evaluator slot
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertStateMachine {
    state: AlertState,
}

impl AlertStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AlertStatus {
        self.state.status
    }

    /// Advance one tick and return the resulting status
    pub fn tick(&mut self, rates: &BurnRates, thresholds: &AlertThresholds) -> AlertStatus {
        self.state = next_state(self.state, rates, thresholds);
        self.state.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> AlertThresholds {
        AlertThresholds {
            fast: 14.4,
            slow: 6.0,
            hysteresis_ticks: DEFAULT_HYSTERESIS_TICKS,
        }
    }

    fn rates(five_min: f64, one_hour: f64, six_hour: f64, day: f64) -> BurnRates {
        BurnRates {
            five_min,
            one_hour,
            six_hour,
            twenty_four_hour: day,
        }
    }

    #[test]
    fn test_fast_burn_needs_corroboration() {
        let mut fsm = AlertStateMachine::new();

        // 1h window above threshold but the 5m window is quiet: a single
        // old spike, not an active incident
        let status = fsm.tick(&rates(1.0, 15.0, 2.0, 1.0), &thresholds());
        assert_eq!(status, AlertStatus::Ok);

        // Both windows above threshold fires critical
        let status = fsm.tick(&rates(16.0, 15.0, 2.0, 1.0), &thresholds());
        assert_eq!(status, AlertStatus::Critical);
    }

    #[test]
    fn test_slow_burn_fires_warning() {
        let mut fsm = AlertStateMachine::new();

        let status = fsm.tick(&rates(0.5, 1.0, 7.0, 3.5), &thresholds());
        assert_eq!(status, AlertStatus::Warning);
    }

    #[test]
    fn test_slow_burn_needs_day_window_corroboration() {
        let mut fsm = AlertStateMachine::new();

        // 24h window under half the slow threshold
        let status = fsm.tick(&rates(0.5, 1.0, 7.0, 2.0), &thresholds());
        assert_eq!(status, AlertStatus::Ok);
    }

    #[test]
    fn test_recovery_requires_hysteresis() {
        let mut fsm = AlertStateMachine::new();
        fsm.tick(&rates(16.0, 15.0, 2.0, 1.0), &thresholds());
        assert_eq!(fsm.status(), AlertStatus::Critical);

        let quiet = rates(0.1, 0.5, 0.5, 0.5);
        assert_eq!(fsm.tick(&quiet, &thresholds()), AlertStatus::Critical);
        assert_eq!(fsm.tick(&quiet, &thresholds()), AlertStatus::Critical);
        // Third consecutive quiet tick clears
        assert_eq!(fsm.tick(&quiet, &thresholds()), AlertStatus::Ok);
    }

    #[test]
    fn test_relapse_resets_clear_streak() {
        let mut fsm = AlertStateMachine::new();
        fsm.tick(&rates(16.0, 15.0, 2.0, 1.0), &thresholds());

        let quiet = rates(0.1, 0.5, 0.5, 0.5);
        fsm.tick(&quiet, &thresholds());
        fsm.tick(&quiet, &thresholds());
        // Burn returns before the streak completes
        fsm.tick(&rates(1.0, 15.0, 2.0, 1.0), &thresholds());
        assert_eq!(fsm.status(), AlertStatus::Critical);

        // The streak starts over
        fsm.tick(&quiet, &thresholds());
        fsm.tick(&quiet, &thresholds());
        assert_eq!(fsm.status(), AlertStatus::Critical);
        assert_eq!(fsm.tick(&quiet, &thresholds()), AlertStatus::Ok);
    }

    #[test]
    fn test_warning_escalates_to_critical() {
        let mut fsm = AlertStateMachine::new();
        fsm.tick(&rates(0.5, 1.0, 7.0, 3.5), &thresholds());
        assert_eq!(fsm.status(), AlertStatus::Warning);

        let status = fsm.tick(&rates(16.0, 15.0, 7.0, 3.5), &thresholds());
        assert_eq!(status, AlertStatus::Critical);
    }

    #[test]
    fn test_warning_recovery() {
        let mut fsm = AlertStateMachine::new();
        fsm.tick(&rates(0.5, 1.0, 7.0, 3.5), &thresholds());

        let quiet = rates(0.1, 0.5, 0.5, 0.5);
        fsm.tick(&quiet, &thresholds());
        fsm.tick(&quiet, &thresholds());
        assert_eq!(fsm.tick(&quiet, &thresholds()), AlertStatus::Ok);
    }
}
