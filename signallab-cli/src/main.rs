//! SignalLab CLI: run and sweep commands.
//!
//! Commands:
//! - `run`: execute the pipeline once and print the stats summary
//! - `sweep`: train once and evaluate a list of entry thresholds

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use signallab_core::data::{BarSource, CsvSource, SyntheticSource};
use signallab_core::model::{BaseRatePredictor, LogisticRegression, Predictor};
use signallab_runner::{
    best_by_total_return, export_sweep_csv, load_bars, parse_thresholds, render_summary,
    render_sweep_table, save_artifacts, sweep_thresholds, Pipeline, PipelineConfig,
};

#[derive(Parser)]
#[command(
    name = "signallab",
    about = "SignalLab CLI: probability signals to long/flat backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once at the configured threshold.
    Run {
        #[command(flatten)]
        run: RunArgs,

        /// Output directory for report.json, trades.csv and equity.csv.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Train once, then evaluate several entry thresholds in parallel.
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Comma-separated thresholds, e.g. 0.5,0.55,0.6.
        #[arg(long, default_value = "0.5,0.55,0.6")]
        thresholds: String,

        /// Output directory for sweep.csv.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    symbol: Option<String>,

    /// History to keep, e.g. 730d, 6mo, 2y, max.
    #[arg(long)]
    period: Option<String>,

    /// Bar interval, e.g. 60m, 1h, 1d.
    #[arg(long)]
    interval: Option<String>,

    /// Entry threshold on the predicted up-probability.
    #[arg(long)]
    proba_th: Option<f64>,

    /// Fraction of dataset rows used for training.
    #[arg(long)]
    train_ratio: Option<f64>,

    #[arg(long)]
    init_cash: Option<f64>,

    /// Bar frequency for annualization, e.g. H, D, 15m.
    #[arg(long)]
    freq: Option<String>,

    /// Proportional fee per fill (0.001 = 10 bps).
    #[arg(long)]
    fees: Option<f64>,

    /// Proportional slippage per fill.
    #[arg(long)]
    slippage: Option<f64>,

    /// Directory holding `{symbol}.csv` bar files.
    #[arg(long, conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Use a deterministic synthetic random walk instead of real data.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Number of synthetic bars.
    #[arg(long, default_value_t = 2_000)]
    bars: usize,

    /// Predictor: logistic or base_rate.
    #[arg(long, default_value = "logistic")]
    model: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { run, output_dir } => run_cmd(run, output_dir),
        Commands::Sweep {
            run,
            thresholds,
            output_dir,
        } => sweep_cmd(run, &thresholds, output_dir),
    }
}

fn run_cmd(args: RunArgs, output_dir: Option<PathBuf>) -> Result<()> {
    let config = build_config(&args)?;
    let source = build_source(&args, &config)?;
    let loaded = load_bars(source.as_ref(), &config)?;
    log::info!("dataset hash {}", loaded.dataset_hash);
    if loaded.is_synthetic() {
        log::warn!("running on SYNTHETIC data");
    }
    let mut predictor = build_predictor(&args.model)?;

    let report = Pipeline::new(config).run(&loaded.bars, predictor.as_mut())?;
    print!("{}", render_summary(&report));

    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(args: RunArgs, thresholds: &str, output_dir: Option<PathBuf>) -> Result<()> {
    let thresholds = parse_thresholds(thresholds)?;
    let config = build_config(&args)?;
    let source = build_source(&args, &config)?;
    let loaded = load_bars(source.as_ref(), &config)?;
    let mut predictor = build_predictor(&args.model)?;

    let points = sweep_thresholds(&config, &loaded.bars, predictor.as_mut(), &thresholds)?;
    print!("{}", render_sweep_table(&points));
    if let Some(best) = best_by_total_return(&points) {
        println!(
            "Best total return at threshold {} ({:.2}%)",
            best.threshold,
            best.stats.total_return * 100.0
        );
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join("sweep.csv");
        std::fs::write(&path, export_sweep_csv(&points)?)?;
        println!("Sweep saved to: {}", path.display());
    }
    Ok(())
}

/// Config file (or defaults) with CLI flags applied on top.
fn build_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(symbol) = &args.symbol {
        config.symbol = symbol.clone();
    }
    if let Some(period) = &args.period {
        config.period = period.parse()?;
    }
    if let Some(interval) = &args.interval {
        config.interval = interval.parse()?;
    }
    if let Some(freq) = &args.freq {
        config.freq = freq.parse()?;
    }
    if let Some(v) = args.proba_th {
        config.proba_th = v;
    }
    if let Some(v) = args.train_ratio {
        config.train_ratio = v;
    }
    if let Some(v) = args.init_cash {
        config.init_cash = v;
    }
    if let Some(v) = args.fees {
        config.fees = v;
    }
    if let Some(v) = args.slippage {
        config.slippage = v;
    }

    config.validate()?;
    Ok(config)
}

fn build_source(args: &RunArgs, config: &PipelineConfig) -> Result<Box<dyn BarSource>> {
    if args.synthetic {
        return Ok(Box::new(SyntheticSource::new(
            args.bars,
            config.interval.clone(),
            config.seed,
        )));
    }
    match &args.data {
        Some(dir) => Ok(Box::new(CsvSource::new(dir))),
        None => bail!("one of --data <dir> or --synthetic is required"),
    }
}

fn build_predictor(name: &str) -> Result<Box<dyn Predictor>> {
    match name {
        "logistic" => Ok(Box::new(LogisticRegression::default())),
        "base_rate" => Ok(Box::new(BaseRatePredictor::new())),
        _ => bail!("unknown model '{name}'. Valid: logistic, base_rate"),
    }
}
