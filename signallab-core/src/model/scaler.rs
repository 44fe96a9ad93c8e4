//! Per-column z-score scaling, fit on the training rows only.

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRow, FEATURE_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Population mean and standard deviation per column. A constant column gets
    /// scale 1 so it maps to zero instead of dividing by zero.
    pub fn fit(rows: &[FeatureRow]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.to_array()) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = [0.0; FEATURE_COUNT];
        for row in rows {
            for ((s, v), m) in var.iter_mut().zip(row.to_array()).zip(mean) {
                *s += (v - m).powi(2);
            }
        }
        let scale = var.map(|s| {
            let sd = (s / n).sqrt();
            if sd > 0.0 {
                sd
            } else {
                1.0
            }
        });
        Self { mean, scale }
    }

    pub fn transform(&self, row: &FeatureRow) -> [f64; FEATURE_COUNT] {
        let mut out = row.to_array();
        for ((x, m), s) in out.iter_mut().zip(self.mean).zip(self.scale) {
            *x = (*x - m) / s;
        }
        out
    }

    pub fn mean(&self) -> &[f64; FEATURE_COUNT] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; FEATURE_COUNT] {
        &self.scale
    }
}
