//! SignalLab Core: bars, feature/label dataset, predictors, signal adapter,
//! trade simulator and performance statistics.
//!
//! Data flows strictly forward:
//! - bars → `features::FeatureLabelBuilder` → `features::Dataset`
//! - train split → `model::Predictor::fit`, test split → `predict_probability`
//! - probabilities → `signals::to_signals` → entry/exit series
//! - signals + close prices → `engine::TradeSimulator` → equity, trades, stats
//!
//! Every stage returns a new value and never mutates its input.

pub mod data;
pub mod domain;
pub mod engine;
pub mod features;
pub mod metrics;
pub mod model;
pub mod signals;
