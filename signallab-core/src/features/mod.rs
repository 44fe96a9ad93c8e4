//! Leakage-safe feature and label construction.
//!
//! Invariant: the feature row stamped `t` is computed from bars `0..t` only (strictly
//! before `t`). The raw feature block is built on unshifted bars and then the whole
//! block is lagged by one bar. The label at `t` looks forward (`close[t+1] > close[t]`)
//! and is never lagged; it exists only so the training partition can be fitted.

pub mod rolling;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;
use rolling::{pct_change, rolling_mean, rolling_std, shift};

/// Hard minimum of usable rows. Fewer rows make the split meaningless.
pub const MIN_DATASET_ROWS: usize = 200;

pub const SHORT_MA: usize = 5;
pub const LONG_MA: usize = 20;
pub const VOL_WINDOW: usize = 20;

/// Column order of `FeatureRow::to_array`.
pub const FEATURE_NAMES: [&str; 6] = ["ret1", "ret2", "ma_gap", "ma_slope", "vol20", "volchg"];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error(
        "not enough rows after feature engineering: {rows} < {required} \
         (extend the history window or use a finer interval)"
    )]
    InsufficientData { rows: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error("train ratio must be strictly between 0 and 1, got {0}")]
    InvalidRatio(f64),

    #[error("split produced an empty partition (train={train}, test={test})")]
    EmptyPartition { train: usize, test: usize },
}

/// Predictors for one timestamp, all computed from strictly earlier bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub ret1: f64,
    pub ret2: f64,
    pub ma_gap: f64,
    pub ma_slope: f64,
    pub vol20: f64,
    pub volchg: f64,
}

impl FeatureRow {
    pub fn from_array(v: [f64; FEATURE_COUNT]) -> Self {
        Self {
            ret1: v[0],
            ret2: v[1],
            ma_gap: v[2],
            ma_slope: v[3],
            vol20: v[4],
            volchg: v[5],
        }
    }

    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.ret1,
            self.ret2,
            self.ma_gap,
            self.ma_slope,
            self.vol20,
            self.volchg,
        ]
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.to_array()[i])
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

/// Aligned `(timestamp, features, label)` rows, chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    timestamps: Vec<NaiveDateTime>,
    features: Vec<FeatureRow>,
    labels: Vec<bool>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn features(&self) -> &[FeatureRow] {
        &self.features
    }

    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    /// Fraction of rows labelled up. NaN for an empty dataset.
    pub fn up_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return f64::NAN;
        }
        self.labels.iter().filter(|&&up| up).count() as f64 / self.labels.len() as f64
    }

    fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self {
            timestamps: self.timestamps[range.clone()].to_vec(),
            features: self.features[range.clone()].to_vec(),
            labels: self.labels[range].to_vec(),
        }
    }

    /// Chronological split: the first `floor(len * train_ratio)` rows train.
    pub fn split(&self, train_ratio: f64) -> Result<Split, SplitError> {
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(SplitError::InvalidRatio(train_ratio));
        }
        let cut = (self.len() as f64 * train_ratio).floor() as usize;
        if cut == 0 || cut >= self.len() {
            return Err(SplitError::EmptyPartition {
                train: cut,
                test: self.len().saturating_sub(cut),
            });
        }
        Ok(Split {
            train: self.slice(0..cut),
            test: self.slice(cut..self.len()),
        })
    }
}

/// Train (earlier) and test (later) partitions. No shuffling.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Builds the feature/label dataset from raw bars.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureLabelBuilder;

impl FeatureLabelBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, bars: &[Bar]) -> Result<Dataset, BuildError> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let ret1 = pct_change(&closes, 1);
        let ma_short = rolling_mean(&closes, SHORT_MA);
        let ma_long = rolling_mean(&closes, LONG_MA);
        let ma_gap: Vec<f64> = ma_short
            .iter()
            .zip(&ma_long)
            .map(|(s, l)| s / l - 1.0)
            .collect();

        // One-bar lag over the entire raw block.
        let columns = [
            shift(&ret1, 1),
            shift(&pct_change(&closes, 2), 1),
            shift(&ma_gap, 1),
            shift(&pct_change(&ma_short, 1), 1),
            shift(&rolling_std(&ret1, VOL_WINDOW), 1),
            shift(&pct_change(&volumes, 1), 1),
        ];

        let mut dataset = Dataset {
            timestamps: Vec::new(),
            features: Vec::new(),
            labels: Vec::new(),
        };
        // The last bar has no forward close, so it never gets a label.
        for t in 0..bars.len().saturating_sub(1) {
            let row = FeatureRow::from_array(std::array::from_fn(|k| columns[k][t]));
            if !row.is_finite() {
                continue;
            }
            dataset.timestamps.push(bars[t].timestamp);
            dataset.features.push(row);
            dataset.labels.push(closes[t + 1] > closes[t]);
        }

        log::debug!(
            "built dataset: {} rows from {} bars",
            dataset.len(),
            bars.len()
        );

        if dataset.len() < MIN_DATASET_ROWS {
            return Err(BuildError::InsufficientData {
                rows: dataset.len(),
                required: MIN_DATASET_ROWS,
            });
        }
        Ok(dataset)
    }
}

/// Shorthand for `FeatureLabelBuilder::new().build(bars)`.
pub fn build_dataset(bars: &[Bar]) -> Result<Dataset, BuildError> {
    FeatureLabelBuilder::new().build(bars)
}
