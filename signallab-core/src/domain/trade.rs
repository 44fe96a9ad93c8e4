//! TradeRecord: a completed long round trip.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// An exit signal fired while long.
    Signal,
    /// The series ended while long; closed at the last bar's price.
    EndOfData,
}

/// A complete round-trip trade record: entry → exit.
///
/// Prices are fill prices (after slippage). `pnl` is in cash units and net of fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub size: f64,

    // ── PnL ──
    pub entry_fee: f64,
    pub exit_fee: f64,
    pub pnl: f64,
    pub return_pct: f64,

    // ── Duration ──
    pub bars_held: usize,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn total_fees(&self) -> f64 {
        self.entry_fee + self.exit_fee
    }
}
