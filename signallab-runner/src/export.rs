//! Reporting and export: JSON, CSV and plain-text artifacts.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape and equity curve for external analysis tools
//! - **Text**: the fixed metric summary printed after a run
//!
//! Persisted reports carry a `schema_version`. Newer versions are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use signallab_core::domain::{TimeSeries, TradeRecord};

use crate::pipeline::{PipelineReport, SCHEMA_VERSION};
use crate::sweep::SweepPoint;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `PipelineReport` to pretty JSON.
pub fn export_json(report: &PipelineReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize PipelineReport to JSON")
}

/// Deserialize a `PipelineReport` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<PipelineReport> {
    let report: PipelineReport =
        serde_json::from_str(json).context("failed to deserialize PipelineReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: entry_bar, entry_time, entry_price, exit_bar, exit_time, exit_price,
/// exit_reason, size, entry_fee, exit_fee, pnl, return_pct, bars_held
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "size",
        "entry_fee",
        "exit_fee",
        "pnl",
        "return_pct",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_bar.to_string(),
            &t.entry_time.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_time.to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:?}", t.exit_reason),
            &format!("{:.6}", t.size),
            &format!("{:.2}", t.entry_fee),
            &format!("{:.2}", t.exit_fee),
            &format!("{:.2}", t.pnl),
            &format!("{:.6}", t.return_pct),
            &t.bars_held.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with timestamp and equity columns.
pub fn export_equity_csv(equity_curve: &TimeSeries<f64>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for (ts, eq) in equity_curve.iter() {
        wtr.write_record([&ts.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export sweep results as CSV, one row per threshold.
pub fn export_sweep_csv(points: &[SweepPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "threshold",
        "entries",
        "trades",
        "total_return",
        "sharpe_ratio",
        "max_drawdown",
        "win_rate",
    ])?;
    for p in points {
        wtr.write_record([
            &p.threshold.to_string(),
            &p.entry_count.to_string(),
            &p.stats.total_trades.to_string(),
            &format!("{:.6}", p.stats.total_return),
            &opt(p.stats.sharpe_ratio, 6),
            &format!("{:.6}", p.stats.max_drawdown),
            &p.win_rate.value().map(|w| format!("{w:.6}")).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates `{symbol}_{run_id prefix}/` under `output_dir` containing:
/// - `report.json`: the full `PipelineReport`
/// - `trades.csv`: trade tape
/// - `equity.csv`: bar-by-bar equity curve
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &PipelineReport, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = report.run_id.chars().take(12).collect();
    let dirname = format!("{}_{}", sanitize(&report.symbol), prefix);
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&report.trades)?)?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&report.equity_curve)?,
    )?;

    log::info!("artifacts written to {}", run_dir.display());
    Ok(run_dir)
}

/// Load a `PipelineReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<PipelineReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn sanitize(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

// ─── Text summary ───────────────────────────────────────────────────

/// Plain-text summary: run metadata, fixed stats block, win rate.
pub fn render_summary(report: &PipelineReport) -> String {
    let s = &report.stats;
    let mut out = String::with_capacity(1024);
    let _ = writeln!(out, "SignalLab run {}", report.run_id);
    let _ = writeln!(out, "Symbol              {}", report.symbol);
    let _ = writeln!(out, "Dataset hash        {}", report.dataset_hash);
    let _ = writeln!(
        out,
        "Train window        {} .. {} ({} rows)",
        report.train_start, report.train_end, report.train_rows
    );
    let _ = writeln!(
        out,
        "Test window         {} .. {} ({} rows)",
        report.test_start, report.test_end, report.test_rows
    );
    let _ = writeln!(
        out,
        "Threshold           {} ({} entries, {} exits)",
        report.config.proba_th, report.entry_count, report.exit_count
    );
    out.push('\n');

    let rows: [(&str, String); 20] = [
        ("Start", s.start.to_string()),
        ("End", s.end.to_string()),
        ("Period (bars)", s.bars.to_string()),
        ("Start Value", format!("{:.2}", s.start_value)),
        ("End Value", format!("{:.2}", s.end_value)),
        ("Total Return [%]", pct(Some(s.total_return))),
        ("Benchmark Return [%]", pct(Some(s.benchmark_return))),
        ("Annualized Return [%]", pct(s.annualized_return)),
        ("Annualized Vol [%]", pct(s.annualized_volatility)),
        ("Max Drawdown [%]", pct(Some(s.max_drawdown))),
        ("Max DD Duration", s.max_drawdown_duration.to_string()),
        ("Total Trades", s.total_trades.to_string()),
        ("Total Fees Paid", format!("{:.2}", s.total_fees_paid)),
        ("Best Trade [%]", pct(s.best_trade)),
        ("Worst Trade [%]", pct(s.worst_trade)),
        ("Profit Factor", opt(s.profit_factor, 3)),
        ("Expectancy", opt(s.expectancy, 2)),
        ("Sharpe Ratio", opt(s.sharpe_ratio, 3)),
        ("Sortino Ratio", opt(s.sortino_ratio, 3)),
        ("Calmar Ratio", opt(s.calmar_ratio, 3)),
    ];
    for (name, value) in rows {
        let _ = writeln!(out, "{name:<22}{value}");
    }
    out.push('\n');
    let _ = writeln!(out, "Win Rate: {}", report.win_rate);
    out
}

/// One line per sweep point.
pub fn render_sweep_table(points: &[SweepPoint]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>9} {:>8} {:>7} {:>12} {:>8} {:>10} {:>10}",
        "threshold", "entries", "trades", "return [%]", "sharpe", "max dd [%]", "win rate"
    );
    for p in points {
        let _ = writeln!(
            out,
            "{:>9} {:>8} {:>7} {:>12} {:>8} {:>10} {:>10}",
            p.threshold,
            p.entry_count,
            p.stats.total_trades,
            pct(Some(p.stats.total_return)),
            opt(p.stats.sharpe_ratio, 3),
            pct(Some(p.stats.max_drawdown)),
            p.win_rate.to_string()
        );
    }
    out
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".into(), |v| format!("{:.2}", v * 100.0))
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".into(), |v| format!("{v:.decimals$}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::Pipeline;
    use signallab_core::data::{generate_bars, BarFrequency};
    use signallab_core::features::FeatureRow;
    use signallab_core::model::{ModelError, Predictor};

    /// Alternates high and low probabilities so the run has several trades.
    struct Alternating;

    impl Predictor for Alternating {
        fn fit(&mut self, _: &[FeatureRow], _: &[bool]) -> Result<(), ModelError> {
            Ok(())
        }

        fn predict_probability(&self, features: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
            Ok((0..features.len())
                .map(|i| if (i / 3) % 2 == 0 { 0.9 } else { 0.1 })
                .collect())
        }
    }

    fn sample_report() -> PipelineReport {
        let bars = generate_bars("0700.HK", 400, &BarFrequency::hourly(), 5);
        Pipeline::new(PipelineConfig::default())
            .run(&bars, &mut Alternating)
            .unwrap()
    }

    // ─── JSON ───────────────────────────────────────────────────────

    #[test]
    fn json_round_trip() {
        let report = sample_report();
        let json = export_json(&report).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.config, report.config);
        assert_eq!(back.trades.len(), report.trades.len());
        assert_eq!(back.equity_curve.index(), report.equity_curve.index());
        for (a, b) in back.equity_curve.values().iter().zip(report.equity_curve.values()) {
            assert!((a - b).abs() <= 1e-9 * b.abs());
        }
        assert_eq!(back.stats.total_trades, report.stats.total_trades);
    }

    #[test]
    fn json_rejects_future_schema() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&report).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn json_rejects_unordered_equity_curve() {
        let report = sample_report();
        let mut value: serde_json::Value = serde_json::to_value(&report).unwrap();
        let index = value["equity_curve"]["index"].as_array_mut().unwrap();
        index.swap(0, 1);
        assert!(import_json(&value.to_string()).is_err());
    }

    // ─── CSV ────────────────────────────────────────────────────────

    #[test]
    fn trades_csv_has_header_and_row_per_trade() {
        let report = sample_report();
        let csv = export_trades_csv(&report.trades).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("entry_bar,entry_time"));
        assert_eq!(lines.len(), report.trades.len() + 1);
        assert!(report.trades.len() > 1);
    }

    #[test]
    fn equity_csv_has_row_per_bar() {
        let report = sample_report();
        let csv = export_equity_csv(&report.equity_curve).unwrap();
        assert_eq!(csv.lines().count(), report.equity_curve.len() + 1);
        assert!(csv.starts_with("timestamp,equity"));
    }

    // ─── Artifacts ──────────────────────────────────────────────────

    #[test]
    fn save_and_load_artifacts() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&report, dir.path()).unwrap();
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("equity.csv").exists());
        assert!(run_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("0700_HK_"));
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.test_rows, report.test_rows);
    }

    // ─── Text ───────────────────────────────────────────────────────

    #[test]
    fn summary_lists_fixed_metrics_and_win_rate() {
        let report = sample_report();
        let text = render_summary(&report);
        for name in ["Total Return [%]", "Max Drawdown [%]", "Sharpe Ratio", "Win Rate:"] {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.contains(&format!("Dataset hash        {}", report.dataset_hash)));
    }

    #[test]
    fn summary_says_no_trades_when_flat() {
        let mut report = sample_report();
        report.trades.clear();
        report.win_rate = signallab_core::metrics::WinRate::NoTrades;
        assert!(render_summary(&report).contains("Win Rate: no trades"));
    }
}
