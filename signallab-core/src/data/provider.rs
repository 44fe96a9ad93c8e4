//! Bar source trait and structured error types.
//!
//! The BarSource trait abstracts over where bars come from (CSV file, synthetic
//! generator, or an external downloader living outside this workspace) so the
//! pipeline can be run and tested without network access.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no bars available for '{symbol}'")]
    Empty { symbol: String },

    #[error("bar timestamps are not strictly increasing at index {index}")]
    NonMonotonic { index: usize },

    #[error("bar at index {index} has a non-finite field")]
    VoidBar { index: usize },

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: cannot parse {field} from '{value}'")]
    Parse {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CsvImport,
    Synthetic,
}

/// Trait for bar sources.
///
/// Implementations return bars for one symbol in chronological order. Validation
/// of the returned series is the caller's job (`validate_bars`).
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError>;
}
