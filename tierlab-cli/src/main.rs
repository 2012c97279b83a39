//! TierLab CLI: run, sweep and synthetic-data commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML run config and save artifacts
//! - `sweep`: run a parameter grid around a config and rank the results
//! - `synth`: write a seeded synthetic BTC-like bar series as CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tierlab_core::domain::ExitReason;
use tierlab_runner::data_loader::write_bars_csv;
use tierlab_runner::export::{save_artifacts, save_sweep_artifacts};
use tierlab_runner::{
    load_bars, run_single_backtest, synthetic_bars, BacktestResult, FitnessMetric, ParamGrid,
    ParamSweep, RunConfig, SweepResults,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tierlab",
    about = "TierLab CLI: multi-tier progressive position backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML run config.
    Run {
        /// Path to a TOML run config.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Sweep a parameter grid around a run config and rank the runs.
    Sweep {
        /// Path to a TOML run config used as the base of every point.
        #[arg(long)]
        config: PathBuf,

        /// JSON parameter grid. Defaults to the built-in BTC grid.
        #[arg(long)]
        grid: Option<PathBuf>,

        /// Run points one after another instead of across threads.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Number of runs to print and include in the report.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Ranking metric (sharpe, sortino, calmar, cagr, total_return, ...).
        #[arg(long, default_value = "sharpe")]
        metric: String,

        /// Output directory for sweep artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Write a seeded synthetic bar series to CSV.
    Synth {
        /// RNG seed.
        #[arg(long)]
        seed: u64,

        /// Number of daily bars.
        #[arg(long, default_value_t = 1000)]
        bars: usize,

        /// Close of the first bar.
        #[arg(long, default_value_t = 20_000.0)]
        start_price: f64,

        /// Date of the first bar (YYYY-MM-DD).
        #[arg(long, default_value = "2020-01-01")]
        start_date: String,

        /// Destination CSV file.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output_dir } => run_backtest_cmd(&config, &output_dir),
        Commands::Sweep {
            config,
            grid,
            sequential,
            top,
            metric,
            output_dir,
        } => run_sweep_cmd(&config, grid.as_deref(), sequential, top, &metric, &output_dir),
        Commands::Synth {
            seed,
            bars,
            start_price,
            start_date,
            out,
        } => run_synth_cmd(seed, bars, start_price, &start_date, &out),
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_backtest_cmd(config_path: &Path, output_dir: &Path) -> Result<()> {
    let config = RunConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;

    let result = run_single_backtest(&config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_sweep_cmd(
    config_path: &Path,
    grid_path: Option<&Path>,
    sequential: bool,
    top: usize,
    metric: &str,
    output_dir: &Path,
) -> Result<()> {
    let config = RunConfig::from_file(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let metric: FitnessMetric = metric.parse().map_err(anyhow::Error::msg)?;

    let grid = match grid_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read grid {}", path.display()))?;
            serde_json::from_str::<ParamGrid>(&content)
                .with_context(|| format!("failed to parse grid {}", path.display()))?
        }
        None => ParamGrid::default_btc(),
    };
    if grid.size() == 0 {
        bail!("parameter grid is empty");
    }

    let loaded = load_bars(&config.backtest)?;
    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .with_metric(metric)
        .sweep(&grid, &config, &loaded)?;

    print_leaderboard(&results, top);
    if loaded.has_synthetic {
        println!("WARNING: Results based on SYNTHETIC data");
        println!();
    }

    let sweep_dir = save_sweep_artifacts(&results, &config.backtest.name, output_dir, top)?;
    println!("Artifacts saved to: {}", sweep_dir.display());

    Ok(())
}

fn run_synth_cmd(
    seed: u64,
    bars: usize,
    start_price: f64,
    start_date: &str,
    out: &Path,
) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be at least 1");
    }
    if !(start_price.is_finite() && start_price > 0.0) {
        bail!("--start-price must be a positive number, got {start_price}");
    }
    let start_date = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
        .with_context(|| format!("invalid --start-date '{start_date}'"))?;

    let series = synthetic_bars(seed, bars, start_price, start_date);
    let file = std::fs::File::create(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_bars_csv(&series, file).with_context(|| format!("failed to write {}", out.display()))?;

    println!(
        "Wrote {} bars ({} to {}) to {}",
        series.len(),
        series[0].date,
        series[series.len() - 1].date,
        out.display()
    );
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Name:           {}", result.name);
    println!(
        "Period:         {} to {}",
        result.start_date, result.end_date
    );
    println!(
        "Bars:           {} ({} warmup, {} indicator warmup)",
        result.bar_count, result.warmup_bars, result.indicator_warmup
    );
    println!("Trades:         {}", m.trade_count);
    println!("Final Value:    {:.2}", result.final_value);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Calmar:         {:.3}", m.calmar);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    println!("Max Consec Win: {}", m.max_consecutive_wins);
    println!("Max Consec Loss:{}", m.max_consecutive_losses);
    println!();
    println!("--- Exits ---");
    for reason in ExitReason::ALL {
        println!("{:<16}{}", format!("{reason}:"), m.exit_count(reason));
    }
    if result.breaker_trips > 0 || result.skipped_entries > 0 {
        println!();
        println!("Breaker Trips:  {}", result.breaker_trips);
        println!("Skipped Entries:{}", result.skipped_entries);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_leaderboard(results: &SweepResults, top: usize) {
    println!();
    println!(
        "=== Sweep: {} runs ranked by {:?} ===",
        results.len(),
        results.metric()
    );
    println!(
        "{:>4}  {:<44} {:>9} {:>8} {:>9} {:>7}",
        "Rank", "Parameters", "Fitness", "Return", "Max DD", "Trades"
    );
    println!("{}", "-".repeat(86));
    for (i, run) in results.top_n(top).iter().enumerate() {
        let m = &run.result.metrics;
        println!(
            "{:>4}  {:<44} {:>9.3} {:>7.2}% {:>8.2}% {:>7}",
            i + 1,
            run.point.label(),
            results.metric().extract(m),
            m.total_return * 100.0,
            m.max_drawdown * 100.0,
            m.trade_count
        );
    }
    println!();
}
