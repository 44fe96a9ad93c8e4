//! Signal adapter: turns predicted probabilities into long/flat instructions.
//!
//! Signals never see portfolio state. Timing rule:
//! - `entries[t] = p[t] > threshold` (strict; equal never enters)
//! - `exits[0] = false`, `exits[t] = !entries[t-1]`
//!
//! Positions are counted in the NaN-dropped series, so a dropped probability does
//! not leave a hole in the shift.

use thiserror::Error;

use crate::domain::{ProbabilitySeries, SignalSeries};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("no defined probabilities to convert into signals")]
    Empty,

    #[error("threshold must be finite, got {0}")]
    InvalidThreshold(f64),
}

/// Entry and exit series sharing one index.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPair {
    pub entries: SignalSeries,
    pub exits: SignalSeries,
}

/// Map probabilities and a threshold to `(entries, exits)`.
pub fn to_signals(
    probabilities: &ProbabilitySeries,
    threshold: f64,
) -> Result<SignalPair, SignalError> {
    if !threshold.is_finite() {
        return Err(SignalError::InvalidThreshold(threshold));
    }
    let defined = probabilities.drop_nan();
    if defined.is_empty() {
        return Err(SignalError::Empty);
    }

    let entries = defined.map(|&p| p > threshold);
    let exits = entries.map(|&e| !e).shift_forward(false);

    log::debug!(
        "signals: {} bars, {} entries, {} exits (threshold {threshold})",
        entries.len(),
        entries.count_true(),
        exits.count_true()
    );
    Ok(SignalPair { entries, exits })
}
