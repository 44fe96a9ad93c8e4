//! Integration tests for the runner: full pipeline on synthetic and CSV bars.

use std::io::Write;

use signallab_core::data::{BarFrequency, CsvSource, DataSource, SyntheticSource};
use signallab_core::metrics::WinRate;
use signallab_core::model::{BaseRatePredictor, LogisticRegression};
use signallab_runner::{
    dataset_hash, import_json, export_json, load_bars, sweep_thresholds, Pipeline, PipelineConfig,
    PipelineError,
};

fn synthetic_config() -> PipelineConfig {
    PipelineConfig {
        symbol: "SYN".into(),
        ..PipelineConfig::default()
    }
}

fn synthetic_bars(n: usize) -> Vec<signallab_core::domain::Bar> {
    let source = SyntheticSource::new(n, BarFrequency::hourly(), 42);
    load_bars(&source, &synthetic_config()).unwrap().bars
}

#[test]
fn logistic_pipeline_end_to_end() {
    let bars = synthetic_bars(1_000);
    let report = Pipeline::new(synthetic_config())
        .run(&bars, &mut LogisticRegression::default())
        .unwrap();

    assert_eq!(report.train_rows + report.test_rows, 1_000 - 22);
    assert_eq!(report.equity_curve.len(), report.test_rows);
    assert_eq!(report.probability_summary.count, report.test_rows);
    assert!(report.train_end < report.test_start);
    assert_eq!(report.stats.total_trades, report.trades.len());
    assert_eq!(report.dataset_hash, dataset_hash(&bars));
    match report.win_rate {
        WinRate::NoTrades => assert!(report.trades.is_empty()),
        WinRate::Rate(r) => assert!((0.0..=1.0).contains(&r)),
    }
    let pnl: f64 = report.trades.iter().map(|t| t.pnl).sum();
    assert!((report.stats.end_value - report.config.init_cash - pnl).abs() < 1e-6);
}

#[test]
fn identical_runs_are_identical() {
    let bars = synthetic_bars(600);
    let a = Pipeline::new(synthetic_config())
        .run(&bars, &mut LogisticRegression::default())
        .unwrap();
    let b = Pipeline::new(synthetic_config())
        .run(&bars, &mut LogisticRegression::default())
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn sweep_matches_sequential_runs() {
    let bars = synthetic_bars(800);
    let thresholds = [0.4, 0.5, 0.55, 0.6];
    let points = sweep_thresholds(
        &synthetic_config(),
        &bars,
        &mut LogisticRegression::default(),
        &thresholds,
    )
    .unwrap();

    assert_eq!(points.len(), thresholds.len());
    for (point, &th) in points.iter().zip(&thresholds) {
        assert_eq!(point.threshold, th);
        let config = PipelineConfig {
            proba_th: th,
            ..synthetic_config()
        };
        let report = Pipeline::new(config)
            .run(&bars, &mut LogisticRegression::default())
            .unwrap();
        assert_eq!(point.stats, report.stats);
        assert_eq!(point.win_rate, report.win_rate);
        assert_eq!(point.entry_count, report.entry_count);
    }
}

#[test]
fn sweep_rejects_out_of_range_threshold() {
    let bars = synthetic_bars(400);
    let err = sweep_thresholds(
        &synthetic_config(),
        &bars,
        &mut BaseRatePredictor::new(),
        &[0.5, 1.2],
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn report_json_round_trips_and_rejects_newer_schema() {
    let bars = synthetic_bars(400);
    let report = Pipeline::new(synthetic_config())
        .run(&bars, &mut BaseRatePredictor::new())
        .unwrap();
    let json = export_json(&report).unwrap();
    assert_eq!(import_json(&json).unwrap().run_id, report.run_id);

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["schema_version"] = serde_json::json!(99);
    assert!(import_json(&value.to_string()).is_err());
}

#[test]
fn csv_source_feeds_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let bars = synthetic_bars(400);
    let mut file = std::fs::File::create(dir.path().join("CSV.csv")).unwrap();
    writeln!(file, "Datetime,Open,High,Low,Close,Volume").unwrap();
    for b in &bars {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            b.timestamp.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        )
        .unwrap();
    }
    drop(file);

    let config = PipelineConfig {
        symbol: "CSV".into(),
        ..PipelineConfig::default()
    };
    let loaded = load_bars(&CsvSource::new(dir.path()), &config).unwrap();
    assert_eq!(loaded.source, DataSource::CsvImport);
    assert_eq!(loaded.bars.len(), 400);

    let report = Pipeline::new(config)
        .run(&loaded.bars, &mut BaseRatePredictor::new())
        .unwrap();
    assert_eq!(report.symbol, "CSV");
}

#[test]
fn missing_csv_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        symbol: "NOPE".into(),
        ..PipelineConfig::default()
    };
    assert!(load_bars(&CsvSource::new(dir.path()), &config).is_err());
}
