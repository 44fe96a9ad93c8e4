//! Pipeline runner: wires dataset, predictor, signal adapter and simulator.
//!
//! Stages, in order, each aborting the run on its first error:
//! 1. validate bars
//! 2. build the feature/label dataset and split it in time order
//! 3. fit the predictor on train, predict the test window
//! 4. probabilities → entry/exit signals at `proba_th`
//! 5. simulate on the test-window close prices and report
//!
//! `predict` (stages 1-3) and `evaluate` (stages 4-5) are public so a threshold
//! sweep can train once and evaluate many times.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use signallab_core::data::{validate_bars, DataError};
use signallab_core::domain::{
    close_series, Bar, PriceSeries, ProbabilitySeries, TimeSeries, TradeRecord,
};
use signallab_core::engine::{SimulationError, SimulationResult, TradeSimulator};
use signallab_core::features::{BuildError, FeatureLabelBuilder, SplitError};
use signallab_core::metrics::{PerformanceStats, WinRate};
use signallab_core::model::{ModelError, Predictor};
use signallab_core::signals::{to_signals, SignalError, SignalPair};

use crate::config::{ConfigError, PipelineConfig, RunId};
use crate::data_loader::dataset_hash;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the pipeline, one variant per stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("dataset error: {0}")]
    Build(#[from] BuildError),
    #[error("split error: {0}")]
    Split(#[from] SplitError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("prediction error: {0}")]
    Prediction(String),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Output of stages 1-3: test-window probabilities and matching close prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedWindow {
    /// BLAKE3 fingerprint of the input bars.
    pub dataset_hash: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    pub probabilities: ProbabilitySeries,
    /// Close prices reindexed onto the probability timestamps.
    pub prices: PriceSeries,
}

/// Distribution of the predicted probabilities over the test window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilitySummary {
    pub count: usize,
    /// Non-NaN predictions.
    pub defined: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Predictions strictly above the entry threshold.
    pub above_threshold: usize,
}

impl ProbabilitySummary {
    pub fn from_series(probabilities: &ProbabilitySeries, threshold: f64) -> Self {
        let defined: Vec<f64> = probabilities
            .values()
            .iter()
            .copied()
            .filter(|p| !p.is_nan())
            .collect();
        Self {
            count: probabilities.len(),
            defined: defined.len(),
            mean: (!defined.is_empty())
                .then(|| defined.iter().sum::<f64>() / defined.len() as f64),
            min: defined.iter().copied().reduce(f64::min),
            max: defined.iter().copied().reduce(f64::max),
            above_threshold: defined.iter().filter(|&&p| p > threshold).count(),
        }
    }
}

/// Complete result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    /// Absent in reports written before the field existed.
    #[serde(default)]
    pub dataset_hash: String,
    pub config: PipelineConfig,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    pub test_start: NaiveDateTime,
    pub test_end: NaiveDateTime,
    pub probability_summary: ProbabilitySummary,
    pub entry_count: usize,
    pub exit_count: usize,
    pub stats: PerformanceStats,
    pub win_rate: WinRate,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: TimeSeries<f64>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl PipelineReport {
    /// Win rate as a fraction, `None` when there were no trades.
    pub fn win_rate_value(&self) -> Option<f64> {
        self.win_rate.value()
    }
}

/// Runs the full pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all stages at `config.proba_th`.
    pub fn run(
        &self,
        bars: &[Bar],
        predictor: &mut dyn Predictor,
    ) -> Result<PipelineReport, PipelineError> {
        let window = self.predict(bars, predictor)?;
        let (signals, result) = self.evaluate(&window, self.config.proba_th)?;
        self.report(&window, &signals, result)
    }

    /// Stages 1-3: validate, build, split, fit, predict.
    pub fn predict(
        &self,
        bars: &[Bar],
        predictor: &mut dyn Predictor,
    ) -> Result<PredictedWindow, PipelineError> {
        self.config.validate()?;
        validate_bars(&self.config.symbol, bars)?;

        let dataset = FeatureLabelBuilder::new().build(bars)?;
        let split = dataset.split(self.config.train_ratio)?;
        log::info!(
            "dataset: {} rows (train {}, test {}), up-rate {:.3}",
            dataset.len(),
            split.train.len(),
            split.test.len(),
            dataset.up_rate()
        );

        predictor.fit(split.train.features(), split.train.labels())?;
        let probs = predictor.predict_probability(split.test.features())?;
        check_probabilities(&probs, split.test.len())?;

        let probabilities = TimeSeries::new(split.test.timestamps().to_vec(), probs)
            .map_err(|e| PipelineError::Prediction(e.to_string()))?;
        let prices = close_series(bars)
            .and_then(|closes| closes.reindex(probabilities.index()))
            .map_err(SimulationError::from)?;

        let train_ts = split.train.timestamps();
        let (Some(&train_start), Some(&train_end)) = (train_ts.first(), train_ts.last()) else {
            return Err(SplitError::EmptyPartition {
                train: 0,
                test: split.test.len(),
            }
            .into());
        };

        Ok(PredictedWindow {
            dataset_hash: dataset_hash(bars),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            train_start,
            train_end,
            probabilities,
            prices,
        })
    }

    /// Stages 4-5 at `threshold`. Does not touch `window`.
    pub fn evaluate(
        &self,
        window: &PredictedWindow,
        threshold: f64,
    ) -> Result<(SignalPair, SimulationResult), PipelineError> {
        let signals = to_signals(&window.probabilities, threshold)?;
        let result = TradeSimulator::new(self.config.simulation_config()).simulate(
            &window.prices,
            &signals.entries,
            &signals.exits,
        )?;
        log::info!(
            "threshold {threshold}: {} entries, {} trades, total return {:.4}",
            signals.entries.count_true(),
            result.trades.len(),
            result.stats.total_return
        );
        Ok((signals, result))
    }

    fn report(
        &self,
        window: &PredictedWindow,
        signals: &SignalPair,
        result: SimulationResult,
    ) -> Result<PipelineReport, PipelineError> {
        let index = window.probabilities.index();
        let (Some(&test_start), Some(&test_end)) = (index.first(), index.last()) else {
            return Err(PipelineError::Prediction("empty test window".into()));
        };
        Ok(PipelineReport {
            schema_version: SCHEMA_VERSION,
            run_id: self.config.run_id()?,
            symbol: self.config.symbol.clone(),
            dataset_hash: window.dataset_hash.clone(),
            config: self.config.clone(),
            train_rows: window.train_rows,
            test_rows: window.test_rows,
            train_start: window.train_start,
            train_end: window.train_end,
            test_start,
            test_end,
            probability_summary: ProbabilitySummary::from_series(
                &window.probabilities,
                self.config.proba_th,
            ),
            entry_count: signals.entries.count_true(),
            exit_count: signals.exits.count_true(),
            stats: result.stats,
            win_rate: result.win_rate,
            trades: result.trades,
            equity_curve: result.equity_curve,
        })
    }
}

/// Predictions must cover the test window exactly and lie in [0, 1]. NaN is
/// allowed and means "no prediction".
fn check_probabilities(probs: &[f64], expected: usize) -> Result<(), PipelineError> {
    if probs.len() != expected {
        return Err(PipelineError::Prediction(format!(
            "predictor returned {} probabilities for {expected} test rows",
            probs.len()
        )));
    }
    if let Some((i, p)) = probs
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_nan() && !(0.0..=1.0).contains(*p))
    {
        return Err(PipelineError::Prediction(format!(
            "probability {p} at test row {i} is outside [0, 1]"
        )));
    }
    Ok(())
}
