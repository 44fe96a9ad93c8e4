//! Performance statistics: pure functions over an equity curve and trade list.
//!
//! `PerformanceStats` is a fixed, versioned schema. Metrics that can be undefined
//! (no trades, zero variance, no drawdown, no losing trades) are `Option<f64>`;
//! `None` is the explicit "undefined" sentinel and is never collapsed to 0.0.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::data::BarFrequency;
use crate::domain::{ExitReason, PriceSeries, TimeSeries, TradeRecord};

/// Bumped whenever a field is added, removed or changes meaning.
pub const STATS_SCHEMA_VERSION: u32 = 1;

/// Fraction of winning trades, or the explicit absence of trades.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinRate {
    NoTrades,
    Rate(f64),
}

impl WinRate {
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        if trades.is_empty() {
            return Self::NoTrades;
        }
        let winners = trades.iter().filter(|t| t.is_winner()).count();
        Self::Rate(winners as f64 / trades.len() as f64)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::NoTrades => None,
            Self::Rate(r) => Some(*r),
        }
    }
}

impl fmt::Display for WinRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTrades => f.write_str("no trades"),
            Self::Rate(r) => write!(f, "{:.2}%", r * 100.0),
        }
    }
}

/// Summary statistics of one simulation. Fractions, not percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub schema_version: u32,

    // ── Window ──
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bars: usize,
    pub frequency: BarFrequency,

    // ── Returns ──
    pub start_value: f64,
    pub end_value: f64,
    pub total_return: f64,
    pub benchmark_return: f64,
    pub annualized_return: Option<f64>,
    pub annualized_volatility: Option<f64>,

    // ── Risk ──
    /// Largest peak-to-trough decline as a positive fraction of the peak.
    pub max_drawdown: f64,
    /// Longest stretch, in bars, spent below a previous equity peak.
    pub max_drawdown_duration: usize,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub calmar_ratio: Option<f64>,

    // ── Trades ──
    pub total_trades: usize,
    pub total_closed_trades: usize,
    pub total_end_of_data_trades: usize,
    pub total_fees_paid: f64,
    pub win_rate: WinRate,
    pub best_trade: Option<f64>,
    pub worst_trade: Option<f64>,
    pub avg_winning_trade: Option<f64>,
    pub avg_losing_trade: Option<f64>,
    pub profit_factor: Option<f64>,
    pub expectancy: Option<f64>,
}

impl PerformanceStats {
    /// Compute all metrics. `equity` and `prices` share the simulation index.
    pub fn compute(
        equity: &TimeSeries<f64>,
        prices: &PriceSeries,
        trades: &[TradeRecord],
        initial_cash: f64,
        frequency: &BarFrequency,
    ) -> Self {
        let curve = equity.values();
        let ppy = frequency.periods_per_year();
        let returns = bar_returns(curve, initial_cash);
        let end_value = curve.last().copied().unwrap_or(initial_cash);
        let annualized = annualized_return(initial_cash, end_value, curve.len(), ppy);
        let (max_dd, max_dd_duration) = drawdown(curve, initial_cash);

        Self {
            schema_version: STATS_SCHEMA_VERSION,
            start: equity.first_timestamp().unwrap_or_default(),
            end: equity.last_timestamp().unwrap_or_default(),
            bars: curve.len(),
            frequency: frequency.clone(),
            start_value: initial_cash,
            end_value,
            total_return: ratio_minus_one(end_value, initial_cash),
            benchmark_return: benchmark_return(prices.values()),
            annualized_return: annualized,
            annualized_volatility: std_dev(&returns).map(|s| s * ppy.sqrt()),
            max_drawdown: max_dd,
            max_drawdown_duration: max_dd_duration,
            sharpe_ratio: sharpe_ratio(&returns, ppy),
            sortino_ratio: sortino_ratio(&returns, ppy),
            calmar_ratio: match annualized {
                Some(a) if max_dd > 0.0 => Some(a / max_dd),
                _ => None,
            },
            total_trades: trades.len(),
            total_closed_trades: trades
                .iter()
                .filter(|t| t.exit_reason == ExitReason::Signal)
                .count(),
            total_end_of_data_trades: trades
                .iter()
                .filter(|t| t.exit_reason == ExitReason::EndOfData)
                .count(),
            total_fees_paid: trades.iter().map(TradeRecord::total_fees).sum(),
            win_rate: WinRate::from_trades(trades),
            best_trade: trades.iter().map(|t| t.return_pct).reduce(f64::max),
            worst_trade: trades.iter().map(|t| t.return_pct).reduce(f64::min),
            avg_winning_trade: mean(trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.return_pct)),
            avg_losing_trade: mean(trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.return_pct)),
            profit_factor: profit_factor(trades),
            expectancy: mean(trades.iter().map(|t| t.pnl)),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Per-bar returns, the first measured against `initial_cash`.
pub fn bar_returns(equity: &[f64], initial_cash: f64) -> Vec<f64> {
    let mut prev = initial_cash;
    equity
        .iter()
        .map(|&eq| {
            let r = if prev > 0.0 { eq / prev - 1.0 } else { 0.0 };
            prev = eq;
            r
        })
        .collect()
}

/// `(end / start)^(periods_per_year / bars) - 1`.
pub fn annualized_return(start: f64, end: f64, bars: usize, periods_per_year: f64) -> Option<f64> {
    if bars == 0 || start <= 0.0 || end <= 0.0 {
        return None;
    }
    Some((end / start).powf(periods_per_year / bars as f64) - 1.0)
}

/// Maximum drawdown (positive fraction) and its longest underwater stretch in bars.
///
/// `initial_cash` is the starting peak, so costs paid on the first bar count.
pub fn drawdown(equity: &[f64], initial_cash: f64) -> (f64, usize) {
    let mut peak = initial_cash;
    let mut max_dd = 0.0_f64;
    let mut underwater = 0usize;
    let mut longest = 0usize;

    for &eq in equity {
        if eq >= peak {
            peak = eq;
            underwater = 0;
        } else {
            underwater += 1;
            longest = longest.max(underwater);
            if peak > 0.0 {
                max_dd = max_dd.max((peak - eq) / peak);
            }
        }
    }
    (max_dd, longest)
}

/// Annualized Sharpe ratio, zero risk-free rate.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> Option<f64> {
    let m = mean(returns.iter().copied())?;
    let s = std_dev(returns)?;
    if s < 1e-15 {
        return None;
    }
    Some(m / s * periods_per_year.sqrt())
}

/// Annualized Sortino ratio: downside deviation over all bars.
pub fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> Option<f64> {
    let m = mean(returns.iter().copied())?;
    let downside =
        (returns.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / returns.len() as f64).sqrt();
    if downside < 1e-15 {
        return None;
    }
    Some(m / downside * periods_per_year.sqrt())
}

/// Gross profit over gross loss. Undefined without a losing trade.
pub fn profit_factor(trades: &[TradeRecord]) -> Option<f64> {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();
    if gross_loss < 1e-12 {
        return None;
    }
    Some(gross_profit / gross_loss)
}

/// Buy-and-hold return over the same price window.
pub fn benchmark_return(prices: &[f64]) -> f64 {
    match (prices.first(), prices.last()) {
        (Some(&first), Some(&last)) => ratio_minus_one(last, first),
        _ => 0.0,
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn ratio_minus_one(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den - 1.0
    } else {
        0.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Sample standard deviation (ddof = 1).
fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values.iter().copied())?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}
