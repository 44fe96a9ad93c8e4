//! Bar-by-bar long/flat state machine.
//!
//! Per bar, in chronological order:
//! 1. Resolve the bar's signals against the current state (`SignalConflict`).
//! 2. FLAT + entry → LONG at the close; LONG + exit → FLAT at the close.
//! 3. Mark equity to the close.
//!
//! A position still open after the last bar is closed at the last close with the
//! normal exit costs (`ExitReason::EndOfData`), and the final equity point shows
//! the liquidated value.

use crate::domain::{ExitReason, PriceSeries, SignalSeries, TimeSeries, TradeRecord};
use crate::engine::state::{
    OpenPosition, PositionState, SignalConflict, SimulationConfig, SimulationResult,
};
use crate::engine::SimulationError;
use crate::metrics::{PerformanceStats, WinRate};

/// Long-only, all-in/all-out backtest engine. Holds no state between runs.
#[derive(Debug, Clone, Default)]
pub struct TradeSimulator {
    config: SimulationConfig,
}

impl TradeSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn simulate(
        &self,
        prices: &PriceSeries,
        entries: &SignalSeries,
        exits: &SignalSeries,
    ) -> Result<SimulationResult, SimulationError> {
        self.validate_config()?;
        let (entries, exits) = align_signals(prices, entries, exits)?;
        let costs = self.config.costs;

        let closes = prices.values();
        let index = prices.index();
        let mut cash = self.config.initial_cash;
        let mut state = PositionState::Flat;
        let mut trades = Vec::new();
        let mut equity = Vec::with_capacity(closes.len());

        for (bar, (&close, timestamp)) in closes.iter().zip(index.iter().copied()).enumerate() {
            let (entry, exit) = match (self.config.conflict, entries[bar], exits[bar]) {
                (SignalConflict::IgnoreBoth, true, true) => (false, false),
                (_, e, x) => (e, x),
            };

            state = match state {
                PositionState::Flat if entry => {
                    let fill = costs.buy_all(cash, close);
                    let position = OpenPosition {
                        entry_bar: bar,
                        entry_time: timestamp,
                        entry_price: fill.price,
                        units: fill.units,
                        entry_fee: fill.fee,
                        cost_basis: cash,
                    };
                    cash = 0.0;
                    PositionState::Long(position)
                }
                PositionState::Long(position) if exit => {
                    let (record, proceeds) =
                        close_position(&position, bar, timestamp, close, ExitReason::Signal, costs);
                    cash = proceeds;
                    trades.push(record);
                    PositionState::Flat
                }
                unchanged => unchanged,
            };

            equity.push(match state {
                PositionState::Flat => cash,
                PositionState::Long(position) => cash + position.units * close,
            });
        }

        if let (PositionState::Long(position), Some(last)) = (state, closes.len().checked_sub(1)) {
            let (record, proceeds) = close_position(
                &position,
                last,
                index[last],
                closes[last],
                ExitReason::EndOfData,
                costs,
            );
            cash += proceeds;
            trades.push(record);
            equity[last] = cash;
        }

        let equity_curve = TimeSeries::new(index.to_vec(), equity)?;
        let stats = PerformanceStats::compute(
            &equity_curve,
            prices,
            &trades,
            self.config.initial_cash,
            &self.config.frequency,
        );
        let win_rate = WinRate::from_trades(&trades);

        log::debug!(
            "simulated {} bars: {} trades, final equity {:.2}",
            closes.len(),
            trades.len(),
            stats.end_value
        );

        Ok(SimulationResult {
            equity_curve,
            trades,
            stats,
            win_rate,
        })
    }

    fn validate_config(&self) -> Result<(), SimulationError> {
        let cash = self.config.initial_cash;
        if !(cash.is_finite() && cash > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "initial cash must be positive, got {cash}"
            )));
        }
        if !self.config.costs.is_valid() {
            return Err(SimulationError::InvalidConfig(format!(
                "fees and slippage must be non-negative, got {:?}",
                self.config.costs
            )));
        }
        Ok(())
    }
}

/// Simulate with frictionless costs and state-first conflict handling.
pub fn simulate(
    prices: &PriceSeries,
    entries: &SignalSeries,
    exits: &SignalSeries,
    initial_cash: f64,
    frequency: crate::data::BarFrequency,
) -> Result<SimulationResult, SimulationError> {
    TradeSimulator::new(SimulationConfig::new(initial_cash, frequency)).simulate(
        prices, entries, exits,
    )
}

fn close_position(
    position: &OpenPosition,
    exit_bar: usize,
    exit_time: chrono::NaiveDateTime,
    close: f64,
    reason: ExitReason,
    costs: crate::engine::costs::CostModel,
) -> (TradeRecord, f64) {
    let fill = costs.sell_all(position.units, close);
    let pnl = fill.proceeds - position.cost_basis;
    let record = TradeRecord {
        entry_bar: position.entry_bar,
        entry_time: position.entry_time,
        entry_price: position.entry_price,
        exit_bar,
        exit_time,
        exit_price: fill.price,
        exit_reason: reason,
        size: position.units,
        entry_fee: position.entry_fee,
        exit_fee: fill.fee,
        pnl,
        return_pct: pnl / position.cost_basis,
        bars_held: exit_bar - position.entry_bar,
    };
    (record, fill.proceeds)
}

/// Validate prices and place both signal series on the price index.
///
/// Entries and exits must share one index, every signal timestamp must be a price
/// timestamp, and there must be at least one bar. Price bars with no signal get
/// `false`.
fn align_signals(
    prices: &PriceSeries,
    entries: &SignalSeries,
    exits: &SignalSeries,
) -> Result<(Vec<bool>, Vec<bool>), SimulationError> {
    if prices.is_empty() {
        return Err(SimulationError::InputAlignment(
            "price series is empty".into(),
        ));
    }
    if entries.is_empty() {
        return Err(SimulationError::InputAlignment(
            "signal series are empty; no overlap with prices".into(),
        ));
    }
    if entries.index() != exits.index() {
        return Err(SimulationError::InputAlignment(format!(
            "entries ({} bars) and exits ({} bars) have different indices",
            entries.len(),
            exits.len()
        )));
    }
    if let Some(missing) = entries
        .index()
        .iter()
        .find(|&&ts| prices.position(ts).is_none())
    {
        return Err(SimulationError::InputAlignment(format!(
            "signal timestamp {missing} has no price"
        )));
    }
    if let Some((position, &price)) = prices
        .values()
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && **p > 0.0))
    {
        return Err(SimulationError::InvalidPrice { position, price });
    }

    let entries = entries.reindex_or(prices.index(), false)?;
    let exits = exits.reindex_or(prices.index(), false)?;
    Ok((entries.into_parts().1, exits.into_parts().1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BarFrequency;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn index(n: usize) -> Vec<NaiveDateTime> {
        let t0 = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| t0 + Duration::hours(i as i64)).collect()
    }

    fn prices(values: &[f64]) -> PriceSeries {
        TimeSeries::new(index(values.len()), values.to_vec()).unwrap()
    }

    fn signals(values: &[bool]) -> SignalSeries {
        TimeSeries::new(index(values.len()), values.to_vec()).unwrap()
    }

    #[test]
    fn single_round_trip() {
        let result = simulate(
            &prices(&[100.0, 101.0, 102.0, 103.0]),
            &signals(&[false, true, false, false]),
            &signals(&[false, false, false, true]),
            101.0,
            BarFrequency::hourly(),
        )
        .unwrap();
        assert_eq!(result.trades.len(), 1);
        let t = &result.trades[0];
        assert_eq!(t.entry_price, 101.0);
        assert_eq!(t.exit_price, 103.0);
        assert_eq!(t.pnl, 2.0);
        assert_eq!(t.entry_bar, 1);
        assert_eq!(t.exit_bar, 3);
        assert_eq!(t.bars_held, 2);
        assert_eq!(t.exit_reason, ExitReason::Signal);
        assert_eq!(result.equity_curve.values(), &[101.0, 101.0, 102.0, 103.0]);
    }

    #[test]
    fn open_position_closed_at_last_bar() {
        let result = simulate(
            &prices(&[10.0, 20.0, 15.0]),
            &signals(&[true, false, false]),
            &signals(&[false, false, false]),
            1_000.0,
            BarFrequency::hourly(),
        )
        .unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
        assert_eq!(result.trades[0].exit_bar, 2);
        assert!((result.trades[0].pnl - 500.0).abs() < 1e-9);
        assert!((result.stats.end_value - 1_500.0).abs() < 1e-9);
        assert_eq!(result.stats.total_end_of_data_trades, 1);
    }

    #[test]
    fn repeated_entries_are_no_ops() {
        let result = simulate(
            &prices(&[10.0, 11.0, 12.0, 13.0]),
            &signals(&[true, true, true, false]),
            &signals(&[false, false, false, true]),
            100.0,
            BarFrequency::hourly(),
        )
        .unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].entry_bar, 0);
    }

    #[test]
    fn exits_while_flat_are_no_ops() {
        let result = simulate(
            &prices(&[10.0, 11.0, 12.0]),
            &signals(&[false, false, false]),
            &signals(&[true, true, true]),
            100.0,
            BarFrequency::hourly(),
        )
        .unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.win_rate, WinRate::NoTrades);
        assert_eq!(result.equity_curve.values(), &[100.0, 100.0, 100.0]);
    }

    #[test]
    fn state_first_enters_on_conflicting_bar() {
        let result = simulate(
            &prices(&[10.0, 11.0, 12.0]),
            &signals(&[true, false, false]),
            &signals(&[true, false, true]),
            100.0,
            BarFrequency::hourly(),
        )
        .unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].entry_bar, 0);
        assert_eq!(result.trades[0].exit_bar, 2);
    }

    #[test]
    fn ignore_both_skips_conflicting_bar() {
        let sim = TradeSimulator::new(
            SimulationConfig::new(100.0, BarFrequency::hourly())
                .with_conflict(SignalConflict::IgnoreBoth),
        );
        let result = sim
            .simulate(
                &prices(&[10.0, 11.0, 12.0]),
                &signals(&[true, true, false]),
                &signals(&[true, false, true]),
            )
            .unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].entry_bar, 1);
    }

    #[test]
    fn signals_on_subset_of_price_index() {
        let p = prices(&[10.0, 11.0, 12.0, 13.0]);
        let idx = index(4);
        let entries = TimeSeries::new(vec![idx[1], idx[2]], vec![true, false]).unwrap();
        let exits = TimeSeries::new(vec![idx[1], idx[2]], vec![false, true]).unwrap();
        let result = simulate(&p, &entries, &exits, 110.0, BarFrequency::hourly()).unwrap();
        assert_eq!(result.equity_curve.len(), 4);
        assert_eq!(result.trades[0].entry_bar, 1);
        assert_eq!(result.trades[0].exit_bar, 2);
    }

    #[test]
    fn mismatched_signal_indices_are_rejected() {
        let p = prices(&[10.0, 11.0, 12.0]);
        let err = simulate(
            &p,
            &signals(&[true, false, false]),
            &signals(&[false, true]),
            100.0,
            BarFrequency::hourly(),
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::InputAlignment(_)));
    }

    #[test]
    fn non_overlapping_indices_are_rejected() {
        let p = prices(&[10.0, 11.0]);
        let later: Vec<NaiveDateTime> = index(4)[2..].to_vec();
        let s = TimeSeries::new(later, vec![true, false]).unwrap();
        let err = simulate(&p, &s, &s, 100.0, BarFrequency::hourly()).unwrap_err();
        assert!(matches!(err, SimulationError::InputAlignment(_)));
    }

    #[test]
    fn empty_signals_are_rejected() {
        let p = prices(&[10.0, 11.0]);
        let empty = SignalSeries::empty();
        let err = simulate(&p, &empty, &empty, 100.0, BarFrequency::hourly()).unwrap_err();
        assert!(matches!(err, SimulationError::InputAlignment(_)));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let p = prices(&[10.0, 0.0]);
        let s = signals(&[false, false]);
        let err = simulate(&p, &s, &s, 100.0, BarFrequency::hourly()).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::InvalidPrice { position: 1, .. }
        ));
    }

    #[test]
    fn non_positive_cash_is_rejected() {
        let p = prices(&[10.0]);
        let s = signals(&[false]);
        let err = simulate(&p, &s, &s, 0.0, BarFrequency::hourly()).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfig(_)));
    }

    #[test]
    fn costs_reduce_pnl() {
        let p = prices(&[100.0, 110.0]);
        let entries = signals(&[true, false]);
        let exits = signals(&[false, true]);
        let frictionless = simulate(&p, &entries, &exits, 1_000.0, BarFrequency::hourly())
            .unwrap();
        let costly = TradeSimulator::new(
            SimulationConfig::new(1_000.0, BarFrequency::hourly()).with_costs(
                crate::engine::CostModel {
                    fees: 0.001,
                    slippage: 0.001,
                },
            ),
        )
        .simulate(&p, &entries, &exits)
        .unwrap();
        assert!(costly.trades[0].pnl < frictionless.trades[0].pnl);
        assert!(costly.stats.total_fees_paid > 0.0);
        let final_eq = *costly.equity_curve.values().last().unwrap();
        assert!((final_eq - 1_000.0 - costly.trades[0].pnl).abs() < 1e-9);
    }
}
