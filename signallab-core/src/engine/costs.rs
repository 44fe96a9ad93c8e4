//! Flat proportional transaction costs.
//!
//! Slippage moves the fill price against the trader; fees are charged on the
//! filled notional. Both default to zero.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Fee as a fraction of notional (0.001 = 10 bps).
    pub fees: f64,
    /// Price concession as a fraction of the close.
    pub slippage: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

/// Result of converting cash into units at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryFill {
    pub price: f64,
    pub units: f64,
    pub fee: f64,
}

/// Result of converting units back into cash at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub price: f64,
    pub proceeds: f64,
    pub fee: f64,
}

impl CostModel {
    pub fn frictionless() -> Self {
        Self {
            fees: 0.0,
            slippage: 0.0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.fees.is_finite() && self.fees >= 0.0 && self.slippage.is_finite() && self.slippage >= 0.0
    }

    /// Spend all of `cash` at `close`. `units × price + fee == cash`.
    pub fn buy_all(&self, cash: f64, close: f64) -> EntryFill {
        let price = close * (1.0 + self.slippage);
        let units = cash / (price * (1.0 + self.fees));
        EntryFill {
            price,
            units,
            fee: units * price * self.fees,
        }
    }

    /// Sell all `units` at `close`; `proceeds` are net of the fee.
    pub fn sell_all(&self, units: f64, close: f64) -> ExitFill {
        let price = close * (1.0 - self.slippage);
        let gross = units * price;
        let fee = gross * self.fees;
        ExitFill {
            price,
            proceeds: gross - fee,
            fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_round_trip_is_exact() {
        let c = CostModel::frictionless();
        let entry = c.buy_all(101.0, 101.0);
        assert_eq!(entry.units, 1.0);
        assert_eq!(entry.fee, 0.0);
        let exit = c.sell_all(entry.units, 103.0);
        assert_eq!(exit.proceeds, 103.0);
    }

    #[test]
    fn entry_spends_exactly_the_cash() {
        let c = CostModel {
            fees: 0.001,
            slippage: 0.0005,
        };
        let entry = c.buy_all(10_000.0, 50.0);
        assert!((entry.units * entry.price + entry.fee - 10_000.0).abs() < 1e-9);
        assert!(entry.price > 50.0);
    }

    #[test]
    fn exit_price_worse_than_close() {
        let c = CostModel {
            fees: 0.0,
            slippage: 0.01,
        };
        let exit = c.sell_all(10.0, 100.0);
        assert!((exit.price - 99.0).abs() < 1e-12);
    }

    #[test]
    fn negative_costs_are_invalid() {
        assert!(!CostModel {
            fees: -0.1,
            slippage: 0.0
        }
        .is_valid());
        assert!(CostModel::default().is_valid());
    }
}
