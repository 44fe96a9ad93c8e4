//! Entry-threshold sweep: train once, evaluate many thresholds in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use signallab_core::domain::Bar;
use signallab_core::metrics::{PerformanceStats, WinRate};
use signallab_core::model::Predictor;

use crate::config::{ConfigError, PipelineConfig};
use crate::pipeline::{Pipeline, PipelineError};

/// Result of one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub threshold: f64,
    pub entry_count: usize,
    pub stats: PerformanceStats,
    pub win_rate: WinRate,
}

/// Fit `predictor` once on the training window, then run the signal adapter and
/// simulator for every threshold.
///
/// Results come back in the order of `thresholds`. The first failing threshold
/// fails the whole sweep.
pub fn sweep_thresholds(
    config: &PipelineConfig,
    bars: &[Bar],
    predictor: &mut dyn Predictor,
    thresholds: &[f64],
) -> Result<Vec<SweepPoint>, PipelineError> {
    if let Some(&bad) = thresholds
        .iter()
        .find(|t| !(t.is_finite() && (0.0..=1.0).contains(*t)))
    {
        return Err(ConfigError::Invalid {
            field: "thresholds",
            reason: format!("must be in [0, 1], got {bad}"),
        }
        .into());
    }

    let pipeline = Pipeline::new(config.clone());
    let window = pipeline.predict(bars, predictor)?;
    log::info!(
        "sweeping {} thresholds over {} test bars",
        thresholds.len(),
        window.test_rows
    );

    thresholds
        .par_iter()
        .map(|&threshold| {
            let (signals, result) = pipeline.evaluate(&window, threshold)?;
            Ok(SweepPoint {
                threshold,
                entry_count: signals.entries.count_true(),
                stats: result.stats,
                win_rate: result.win_rate,
            })
        })
        .collect()
}

/// Parse a comma-separated threshold list such as `0.5,0.55,0.6`.
pub fn parse_thresholds(text: &str) -> Result<Vec<f64>, ConfigError> {
    let thresholds = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>().map_err(|_| ConfigError::Invalid {
                field: "thresholds",
                reason: format!("'{s}' is not a number"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if thresholds.is_empty() {
        return Err(ConfigError::Invalid {
            field: "thresholds",
            reason: "no thresholds given".into(),
        });
    }
    Ok(thresholds)
}

/// Highest total return; ties go to the earlier threshold.
pub fn best_by_total_return(points: &[SweepPoint]) -> Option<&SweepPoint> {
    points.iter().reduce(|best, p| {
        if p.stats.total_return > best.stats.total_return {
            p
        } else {
            best
        }
    })
}
