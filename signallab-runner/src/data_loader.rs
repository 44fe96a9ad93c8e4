//! Bar loading for the runner.
//!
//! Loads one symbol from a `BarSource`, trims it to the configured period,
//! validates it and fingerprints the result. Synthetic data is tagged so reports
//! produced from it can be told apart from real runs.

use signallab_core::data::{trim_to_period, validate_bars, BarSource, DataError, DataSource};
use signallab_core::domain::Bar;

use crate::config::PipelineConfig;

/// Bars for one symbol plus their provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over timestamps and OHLCV.
    pub dataset_hash: String,
}

impl LoadedBars {
    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

/// Load, trim and validate `config.symbol` from `source`.
pub fn load_bars(source: &dyn BarSource, config: &PipelineConfig) -> Result<LoadedBars, DataError> {
    let raw = source.load(&config.symbol)?;
    let bars = trim_to_period(&raw, &config.period);
    validate_bars(&config.symbol, &bars)?;

    log::info!(
        "loaded {} bars for {} from {} (period {}, {} before trim)",
        bars.len(),
        config.symbol,
        source.name(),
        config.period,
        raw.len()
    );

    Ok(LoadedBars {
        symbol: config.symbol.clone(),
        dataset_hash: dataset_hash(&bars),
        source: source.source(),
        bars,
    })
}

/// Deterministic fingerprint of a bar series.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp().to_le_bytes());
        for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
