//! Simulator configuration, position state, and run result types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::data::BarFrequency;
use crate::domain::{TimeSeries, TradeRecord};
use crate::engine::costs::CostModel;
use crate::metrics::{PerformanceStats, WinRate};

/// What to do on a bar where both an entry and an exit fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalConflict {
    /// Look only at the signal that can change the current state: entries while
    /// flat, exits while long. At most one transition per bar.
    #[default]
    StateFirst,
    /// Treat a bar with both signals as having neither. This is vectorbt's
    /// default (`conflict_mode="ignore"` in `Portfolio.from_signals`); use
    /// `conflict = "ignore_both"` to reproduce results from vectorbt runs.
    IgnoreBoth,
}

/// Configuration for a single simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    /// Bar duration, used for annualization.
    pub frequency: BarFrequency,
    pub costs: CostModel,
    pub conflict: SignalConflict,
}

impl SimulationConfig {
    pub fn new(initial_cash: f64, frequency: BarFrequency) -> Self {
        Self {
            initial_cash,
            frequency,
            costs: CostModel::frictionless(),
            conflict: SignalConflict::StateFirst,
        }
    }

    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_conflict(mut self, conflict: SignalConflict) -> Self {
        self.conflict = conflict;
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(100_000.0, BarFrequency::hourly())
    }
}

/// Open long position: everything needed to close it into a `TradeRecord`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OpenPosition {
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub units: f64,
    pub entry_fee: f64,
    /// Cash committed at entry (notional + fee).
    pub cost_basis: f64,
}

/// FLAT or LONG. Initial state is FLAT.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PositionState {
    Flat,
    Long(OpenPosition),
}

/// Output of `TradeSimulator::simulate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Mark-to-market equity after each bar's close.
    pub equity_curve: TimeSeries<f64>,
    pub trades: Vec<TradeRecord>,
    pub stats: PerformanceStats,
    pub win_rate: WinRate,
}
