//! Backtest runner: wires together data, indicators, the engine and metrics.
//!
//! Three entry points:
//! - `run_single_backtest()`: resolves the data source, then runs. Used by the CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars. No I/O.
//! - `run_backtest_with_frame()`: pre-loaded bars plus a shared indicator
//!   frame. Used by sweeps, where every point shares the indicator settings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use tierlab_core::domain::{validate_bars, EquityPoint, InputError, Trade};
use tierlab_core::engine::run_with_frame;
use tierlab_core::indicators::IndicatorFrame;
use tierlab_core::{EngineError, StrategyConfig};

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_bars, LoadError, LoadedData};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub run_id: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub config: StrategyConfig,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_value: f64,
    pub bar_count: usize,
    /// Configured entry warmup.
    pub warmup_bars: usize,
    /// First bar at which every indicator was defined.
    pub indicator_warmup: usize,
    pub breaker_trips: usize,
    pub skipped_entries: usize,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run a single backtest from a RunConfig, loading its data first.
pub fn run_single_backtest(config: &RunConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.backtest)?;
    run_backtest_from_bars(config, &loaded)
}

/// Run a backtest with pre-loaded data. No I/O.
pub fn run_backtest_from_bars(
    config: &RunConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    validate_bars(&loaded.bars).map_err(EngineError::from)?;
    let frame = IndicatorFrame::compute(&loaded.bars, &config.strategy.indicators);
    run_backtest_with_frame(config, loaded, &frame)
}

/// Run a backtest against an indicator frame computed by the caller.
///
/// The frame must come from the same bars and `config.strategy.indicators`.
pub fn run_backtest_with_frame(
    config: &RunConfig,
    loaded: &LoadedData,
    frame: &IndicatorFrame,
) -> Result<BacktestResult, RunError> {
    let engine_config = config.engine_config();
    let result = run_with_frame(&loaded.bars, frame, &config.strategy, &engine_config)?;
    let metrics = PerformanceMetrics::from_run(&result);

    // run_with_frame rejects empty series, so both ends exist.
    let (start_date, end_date) = match (loaded.bars.first(), loaded.bars.last()) {
        (Some(first), Some(last)) => (first.date, last.date),
        _ => return Err(EngineError::from(InputError::Empty).into()),
    };

    let run_id = config.run_id(&loaded.dataset_hash);
    info!(
        name = %config.backtest.name,
        run_id = %&run_id[..12],
        total_return = metrics.total_return,
        trades = metrics.trade_count,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        name: config.backtest.name.clone(),
        run_id,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        metrics,
        trades: result.trades,
        equity_curve: result.equity_curve,
        config: config.strategy.clone(),
        start_date,
        end_date,
        initial_capital: result.initial_capital,
        final_value: result.final_value,
        bar_count: loaded.bars.len(),
        warmup_bars: config.backtest.warmup_bars,
        indicator_warmup: result.indicator_warmup,
        breaker_trips: result.breaker_trips,
        skipped_entries: result.skipped_entries,
    })
}
