//! SignalLab Runner: pipeline orchestration, configuration, threshold sweeps,
//! report export.
//!
//! This crate builds on `signallab-core` to provide:
//! - TOML/serde pipeline configuration with content-addressed run ids
//! - Bar loading with period trimming, validation and dataset fingerprinting
//! - The single-run pipeline (dataset → predictor → signals → simulator)
//! - Parallel entry-threshold sweeps
//! - JSON/CSV/text export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod pipeline;
pub mod sweep;

pub use config::{ConfigError, PipelineConfig, RunId};
pub use data_loader::{dataset_hash, load_bars, LoadedBars};
pub use export::{
    export_equity_csv, export_json, export_sweep_csv, export_trades_csv, import_json,
    load_artifacts, render_summary, render_sweep_table, save_artifacts,
};
pub use pipeline::{
    Pipeline, PipelineError, PipelineReport, PredictedWindow, ProbabilitySummary, SCHEMA_VERSION,
};
pub use sweep::{best_by_total_return, parse_thresholds, sweep_thresholds, SweepPoint};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<PipelineReport>();
        assert_sync::<PipelineReport>();
        assert_send::<SweepPoint>();
        assert_sync::<SweepPoint>();
    }

    #[test]
    fn pipeline_types_are_send_sync() {
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
        assert_send::<PredictedWindow>();
        assert_sync::<PredictedWindow>();
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }
}
