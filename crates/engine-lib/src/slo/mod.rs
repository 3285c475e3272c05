//! SLO compliance, error budgets, and burn-rate alerting
//!
//! This module provides:
//! - Rolling good/bad counters per burn-rate window
//! - A pure-function alert state machine with hysteresis
//! - The per-tick evaluator producing measurements and status rows

mod evaluator;
mod state;
mod window;

pub use evaluator::{validate_definition, EvaluatorConfig, SloEvaluator};
pub use state::{
    next_state, AlertState, AlertStateMachine, AlertThresholds, BurnRates,
    DEFAULT_HYSTERESIS_TICKS,
};
pub use window::{RollingCounter, WindowTotals};
