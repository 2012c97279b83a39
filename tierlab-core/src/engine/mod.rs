//! Backtesting engine: the bar-by-bar tier ladder and its supporting types.
//!
//! The engine consumes a validated bar series and its precomputed
//! `IndicatorFrame`, then drives the position ladder one bar at a time:
//! risk exits first, entries second, mark-to-market last.

pub mod loop_runner;
pub mod state;

pub use loop_runner::{run_backtest, run_with_frame, Backtest};
pub use state::{EngineConfig, EngineState, RunResult};

use crate::domain::InputError;
use crate::strategy::StrategyError;
use thiserror::Error;

/// Errors that stop a run before its first bar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input series: {0}")]
    Input(#[from] InputError),

    #[error("invalid strategy: {0}")]
    Strategy(#[from] StrategyError),

    #[error("indicator frame has {rows} rows for {bars} bars")]
    FrameMismatch { bars: usize, rows: usize },

    #[error("initial capital must be positive, got {0}")]
    InvalidCapital(f64),
}
