//! Trade simulator: replays entry/exit signals over close prices as a long/flat
//! account and reports the equity curve, trades and stats.
//!
//! Fills happen at the close of the signal bar. While long the whole account is
//! in the instrument, so equity is `cash + units × close`.

pub mod costs;
pub mod simulator;
pub mod state;

use thiserror::Error;

use crate::domain::SeriesError;

pub use costs::{CostModel, EntryFill, ExitFill};
pub use simulator::{simulate, TradeSimulator};
pub use state::{SignalConflict, SimulationConfig, SimulationResult};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("misaligned inputs: {0}")]
    InputAlignment(String),

    #[error("invalid price {price} at position {position}")]
    InvalidPrice { position: usize, price: f64 },

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Series(#[from] SeriesError),
}
