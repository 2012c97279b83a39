//! TierLab Runner: backtest orchestration, metrics, sweeps and export.
//!
//! This crate builds on `tierlab-core` to provide:
//! - TOML run configs (`[backtest]` + `[strategy]`)
//! - Data loading from CSV or a seeded synthetic series
//! - Single-backtest runner with performance metrics
//! - Parallel parameter sweeps ranked by a fitness metric
//! - JSON/CSV/Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fitness;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{BacktestSection, ConfigError, RunConfig, SyntheticSpec};
pub use data_loader::{load_bars, synthetic_bars, LoadError, LoadedData};
pub use fitness::FitnessMetric;
pub use metrics::PerformanceMetrics;
pub use runner::{
    run_backtest_from_bars, run_backtest_with_frame, run_single_backtest, BacktestResult,
    RunError, SCHEMA_VERSION,
};
pub use sweep::{ParamGrid, ParamSweep, SweepPoint, SweepResults, SweepRun};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }

    #[test]
    fn sweep_types_are_send_sync() {
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
        assert_send::<SweepRun>();
        assert_sync::<SweepRun>();
        assert_send::<FitnessMetric>();
        assert_sync::<FitnessMetric>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
