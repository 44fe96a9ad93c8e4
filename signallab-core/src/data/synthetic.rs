//! Synthetic bars for development and tests.
//!
//! A seeded random walk starting at 100.0. Output depends only on
//! `(symbol, seed, count, interval)`, so a run on synthetic data is reproducible.

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::frequency::BarFrequency;
use super::provider::{BarSource, DataError, DataSource};
use crate::domain::Bar;

/// Generates `count` bars spaced by `interval`.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    count: usize,
    interval: BarFrequency,
    seed: u64,
}

impl SyntheticSource {
    pub fn new(count: usize, interval: BarFrequency, seed: u64) -> Self {
        Self {
            count,
            interval,
            seed,
        }
    }
}

impl BarSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn load(&self, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let bars = generate_bars(symbol, self.count, &self.interval, self.seed);
        if bars.is_empty() {
            return Err(DataError::Empty {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}

fn synthetic_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Generate a deterministic random walk.
///
/// Generation stops early if the next timestamp would leave chrono's range.
pub fn generate_bars(symbol: &str, count: usize, interval: &BarFrequency, seed: u64) -> Vec<Bar> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    hasher.update(&seed.to_le_bytes());
    let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

    let step = interval.duration();
    let mut timestamp = synthetic_epoch();
    let mut price = 100.0_f64;
    let mut bars = Vec::with_capacity(count);

    for _ in 0..count {
        let bar_return: f64 = rng.gen_range(-0.02..0.02);
        let open = price;
        let close = price * (1.0 + bar_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
        let volume = rng.gen_range(10_000..1_000_000u64) as f64;

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        match timestamp.checked_add_signed(step) {
            Some(next) => timestamp = next,
            None => break,
        }
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_bars() {
        let f = BarFrequency::hourly();
        assert_eq!(generate_bars("SPY", 50, &f, 7), generate_bars("SPY", 50, &f, 7));
    }

    #[test]
    fn different_seed_different_bars() {
        let f = BarFrequency::hourly();
        assert_ne!(generate_bars("SPY", 50, &f, 7), generate_bars("SPY", 50, &f, 8));
    }

    #[test]
    fn bars_are_sane_and_spaced_by_interval() {
        let f: BarFrequency = "30m".parse().unwrap();
        let bars = generate_bars("TEST", 100, &f, 1);
        assert_eq!(bars.len(), 100);
        assert!(bars.iter().all(Bar::is_sane));
        for w in bars.windows(2) {
            assert_eq!(w[1].timestamp - w[0].timestamp, chrono::Duration::minutes(30));
        }
    }

    #[test]
    fn oversized_interval_stops_at_time_range() {
        let f: BarFrequency = "1000000000wk".parse().unwrap();
        let bars = generate_bars("TEST", 10, &f, 1);
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn source_rejects_zero_count() {
        let src = SyntheticSource::new(0, BarFrequency::daily(), 1);
        assert!(matches!(src.load("X"), Err(DataError::Empty { .. })));
    }
}
