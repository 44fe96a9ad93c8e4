//! TimeSeries: an immutable, timestamp-indexed column of values.
//!
//! Every stage of the pipeline hands the next stage a fresh `TimeSeries` rather
//! than mutating its input. The index is validated once at construction:
//! equal lengths, strictly increasing timestamps.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building or re-indexing a series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("index has {index} timestamps but {values} values were supplied")]
    LengthMismatch { index: usize, values: usize },

    #[error("index is not strictly increasing at position {position}")]
    NonMonotonic { position: usize },

    #[error("timestamp {timestamp} is not present in the source series")]
    MissingTimestamp { timestamp: NaiveDateTime },
}

/// Values aligned to a strictly increasing timestamp index.
///
/// Deserialization goes through [`TimeSeries::new`], so a stored series with a
/// broken index is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "SeriesParts<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct TimeSeries<T> {
    index: Vec<NaiveDateTime>,
    values: Vec<T>,
}

/// Unvalidated wire form of a `TimeSeries`.
#[derive(Deserialize)]
struct SeriesParts<T> {
    index: Vec<NaiveDateTime>,
    values: Vec<T>,
}

impl<T> TryFrom<SeriesParts<T>> for TimeSeries<T> {
    type Error = SeriesError;

    fn try_from(parts: SeriesParts<T>) -> Result<Self, Self::Error> {
        Self::new(parts.index, parts.values)
    }
}

/// Close prices: the reference for valuation and execution.
pub type PriceSeries = TimeSeries<f64>;

/// Predicted probability of an up move, one per test timestamp.
pub type ProbabilitySeries = TimeSeries<f64>;

/// Boolean entry or exit instructions.
pub type SignalSeries = TimeSeries<bool>;

impl<T> TimeSeries<T> {
    pub fn new(index: Vec<NaiveDateTime>, values: Vec<T>) -> Result<Self, SeriesError> {
        if index.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                index: index.len(),
                values: values.len(),
            });
        }
        if let Some(position) = index.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SeriesError::NonMonotonic {
                position: position + 1,
            });
        }
        Ok(Self { index, values })
    }

    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, &T)> + '_ {
        self.index.iter().copied().zip(self.values.iter())
    }

    /// Position of `timestamp` in the index (binary search).
    pub fn position(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.index.binary_search(&timestamp).ok()
    }

    pub fn get(&self, timestamp: NaiveDateTime) -> Option<&T> {
        self.position(timestamp).map(|i| &self.values[i])
    }

    /// Apply `f` to every value, keeping the index.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> TimeSeries<U> {
        TimeSeries {
            index: self.index.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Consume the series, returning its index and values.
    pub fn into_parts(self) -> (Vec<NaiveDateTime>, Vec<T>) {
        (self.index, self.values)
    }
}

impl<T: Clone> TimeSeries<T> {
    /// Select the values at `index`. Every timestamp must exist in `self`.
    pub fn reindex(&self, index: &[NaiveDateTime]) -> Result<Self, SeriesError> {
        let mut values = Vec::with_capacity(index.len());
        for &timestamp in index {
            let pos = self
                .position(timestamp)
                .ok_or(SeriesError::MissingTimestamp { timestamp })?;
            values.push(self.values[pos].clone());
        }
        Self::new(index.to_vec(), values)
    }

    /// Move every value one position later; the first position takes `fill`.
    pub fn shift_forward(&self, fill: T) -> Self {
        let values = std::iter::once(fill)
            .chain(self.values.iter().take(self.len().saturating_sub(1)).cloned())
            .take(self.len())
            .collect();
        Self {
            index: self.index.clone(),
            values,
        }
    }

    /// Select the values at `index`, substituting `fill` where a timestamp is absent.
    pub fn reindex_or(&self, index: &[NaiveDateTime], fill: T) -> Result<Self, SeriesError> {
        let values = index
            .iter()
            .map(|&ts| self.get(ts).cloned().unwrap_or_else(|| fill.clone()))
            .collect();
        Self::new(index.to_vec(), values)
    }
}

impl TimeSeries<f64> {
    /// Drop NaN entries, keeping the surviving timestamps.
    pub fn drop_nan(&self) -> Self {
        let (index, values) = self
            .iter()
            .filter(|(_, v)| !v.is_nan())
            .map(|(ts, v)| (ts, *v))
            .unzip();
        Self { index, values }
    }
}

impl TimeSeries<bool> {
    /// Number of `true` values.
    pub fn count_true(&self) -> usize {
        self.values.iter().filter(|&&v| v).count()
    }
}
