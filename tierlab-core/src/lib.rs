//! TierLab Core: indicators, signals and the progressive tier-ladder engine.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, position tiers, cycle state, trades, equity points)
//! - Indicator library (WaveTrend, Squeeze-Momentum, ADX/DMI, ATR, moving averages)
//! - Table-driven signal evaluator (tier predicates, exit-signal count)
//! - Bar-by-bar engine with a fixed exit/entry precedence per bar
//! - Strategy configuration and fingerprinting

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signals;
pub mod strategy;

pub use engine::{run_backtest, Backtest, EngineConfig, EngineError, RunResult};
pub use strategy::{RiskParams, StrategyConfig, StrategyError};
