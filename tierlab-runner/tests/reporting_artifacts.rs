//! Artifact round trips from a real run: manifest, CSV tapes, reports.

use tierlab_runner::export::{
    export_trades_csv, generate_report, load_artifacts, save_artifacts, save_sweep_artifacts,
};
use tierlab_runner::{
    load_bars, run_backtest_from_bars, FitnessMetric, ParamGrid, ParamSweep, RunConfig,
};

fn config() -> RunConfig {
    RunConfig::from_toml(
        r#"
[backtest]
name = "artifacts"
synthetic = { seed = 17, bars = 800 }
"#,
    )
    .unwrap()
}

#[test]
fn run_artifacts_round_trip() {
    let config = config();
    let loaded = load_bars(&config.backtest).unwrap();
    let result = run_backtest_from_bars(&config, &loaded).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    let restored = load_artifacts(&run_dir).unwrap();
    assert_eq!(restored.run_id, result.run_id);
    assert_eq!(restored.trades.len(), result.trades.len());
    assert_eq!(restored.equity_curve.len(), result.bar_count);
    assert_eq!(restored.config, result.config);
    assert!(restored.has_synthetic);

    let trades_csv = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades_csv, export_trades_csv(&result.trades).unwrap());
    assert_eq!(trades_csv.lines().count(), result.trades.len() + 1);

    let equity_csv = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
    assert_eq!(equity_csv.lines().count(), result.bar_count + 1);

    let report = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
    assert_eq!(report, generate_report(&result));
    assert!(report.contains("**SYNTHETIC**"));
}

#[test]
fn sweep_artifacts_rank_every_run() {
    let config = config();
    let loaded = load_bars(&config.backtest).unwrap();
    let grid = ParamGrid {
        tier1_oversold: vec![-60.0, -53.0],
        stop_pcts: vec![0.08],
        atr_multipliers: vec![2.0, 3.0],
        partial_tp_thresholds: vec![0.1],
        max_drawdowns: vec![0.3],
    };
    let results = ParamSweep::new()
        .with_metric(FitnessMetric::Calmar)
        .sweep(&grid, &config, &loaded)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let sweep_dir = save_sweep_artifacts(&results, "artifacts", dir.path(), 3).unwrap();

    let leaderboard = std::fs::read_to_string(sweep_dir.join("leaderboard.csv")).unwrap();
    let lines: Vec<&str> = leaderboard.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("rank,run_id,"));
    assert!(lines[1].starts_with("1,"));

    let report = std::fs::read_to_string(sweep_dir.join("report.md")).unwrap();
    assert!(report.contains("4 runs ranked by Calmar"));
    // Top 3 rows plus the two header lines.
    assert_eq!(report.lines().filter(|l| l.starts_with('|')).count(), 5);
}

#[test]
fn corrupted_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("manifest.json"), "{ not json").unwrap();
    assert!(load_artifacts(dir.path()).is_err());
}
