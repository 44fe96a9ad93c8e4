//! Bar loading, validation and history windows.
//!
//! Acquisition proper (downloads, retries, caching) lives outside the core.
//! What stays here is the contract every bar series must satisfy before it
//! enters the pipeline.

pub mod csv_file;
pub mod frequency;
pub mod provider;
pub mod synthetic;

pub use csv_file::{load_csv, CsvSource};
pub use frequency::{BarFrequency, FrequencyError, Period};
pub use provider::{BarSource, DataError, DataSource};
pub use synthetic::{generate_bars, SyntheticSource};

use crate::domain::Bar;

/// Check the series invariants: non-empty, no void bars, strictly increasing time.
pub fn validate_bars(symbol: &str, bars: &[Bar]) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::Empty {
            symbol: symbol.to_string(),
        });
    }
    if let Some(index) = bars.iter().position(Bar::is_void) {
        return Err(DataError::VoidBar { index });
    }
    if let Some(index) = bars
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
    {
        return Err(DataError::NonMonotonic { index: index + 1 });
    }
    Ok(())
}

/// Keep the bars that fall within `period` of the last bar (exclusive lower bound).
/// A window reaching past the earliest representable time keeps every bar.
pub fn trim_to_period(bars: &[Bar], period: &Period) -> Vec<Bar> {
    let (Some(span), Some(last)) = (period.duration(), bars.last()) else {
        return bars.to_vec();
    };
    let Some(cutoff) = last.timestamp.checked_sub_signed(span) else {
        return bars.to_vec();
    };
    bars.iter()
        .filter(|b| b.timestamp > cutoff)
        .cloned()
        .collect()
}
