//! Local CSV bar import.
//!
//! Expected header (case-insensitive, any column order):
//! `timestamp|datetime|date|time, open, high, low, close, volume`.
//! Extra columns are ignored. Rows with a missing value are dropped; malformed
//! values are an error.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::provider::{BarSource, DataError, DataSource};
use crate::domain::Bar;

const TIMESTAMP_COLUMNS: [&str; 4] = ["timestamp", "datetime", "date", "time"];

/// Loads one file per symbol from a directory: `{dir}/{symbol}.csv`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

impl BarSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        load_csv(self.path_for(symbol))
    }
}

/// Read bars from a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();

    let column = |name: &str| -> Result<usize, DataError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    };
    let ts_col = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
        .ok_or_else(|| DataError::MissingColumn("timestamp".to_string()))?;
    let open_col = column("open")?;
    let high_col = column("high")?;
    let low_col = column("low")?;
    let close_col = column("close")?;
    let volume_col = column("volume")?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let field = |col: usize| record.get(col).unwrap_or("");

        let raw_ts = field(ts_col);
        if is_missing(raw_ts) {
            dropped += 1;
            continue;
        }
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataError::Parse {
            row,
            field: "timestamp",
            value: raw_ts.to_string(),
        })?;

        let mut values = [0.0_f64; 5];
        let mut missing = false;
        for (slot, (col, name)) in values.iter_mut().zip([
            (open_col, "open"),
            (high_col, "high"),
            (low_col, "low"),
            (close_col, "close"),
            (volume_col, "volume"),
        ]) {
            match parse_number(field(col)) {
                Some(v) if v.is_finite() => *slot = v,
                Some(_) => missing = true,
                None if is_missing(field(col)) => missing = true,
                None => {
                    return Err(DataError::Parse {
                        row,
                        field: name,
                        value: field(col).to_string(),
                    })
                }
            }
        }
        if missing {
            dropped += 1;
            continue;
        }

        let [open, high, low, close, volume] = values;
        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if dropped > 0 {
        log::warn!(
            "dropped {dropped} incomplete row(s) from {}",
            path.display()
        );
    }
    log::debug!("loaded {} bars from {}", bars.len(), path.display());
    Ok(bars)
}

fn is_missing(value: &str) -> bool {
    value.is_empty()
        || value.eq_ignore_ascii_case("nan")
        || value.eq_ignore_ascii_case("null")
        || value.eq_ignore_ascii_case("na")
}

fn parse_number(value: &str) -> Option<f64> {
    if is_missing(value) {
        return None;
    }
    value.parse().ok()
}

/// Accepts RFC 3339 (normalised to UTC), `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S`
/// and plain dates (midnight).
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S%z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
