//! Domain types for SignalLab

pub mod bar;
pub mod series;
pub mod trade;

pub use bar::Bar;
pub use series::{PriceSeries, ProbabilitySeries, SeriesError, SignalSeries, TimeSeries};
pub use trade::{ExitReason, TradeRecord};

/// Close prices of `bars` as a `PriceSeries`.
pub fn close_series(bars: &[Bar]) -> Result<PriceSeries, SeriesError> {
    TimeSeries::new(
        bars.iter().map(|b| b.timestamp).collect(),
        bars.iter().map(|b| b.close).collect(),
    )
}
