//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape and equity curve for external analysis tools
//! - **Markdown**: human-readable single-run and sweep reports
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tierlab_core::domain::{EntryTier, EquityPoint, ExitReason, Trade};
use tracing::info;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV, one row per full or partial close.
///
/// Columns: entry_date, exit_date, level, direction, entry_price, exit_price,
/// size, pnl_amount, pnl_pct, exit_reason, entry_bar, exit_bar
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "entry_date",
        "exit_date",
        "level",
        "direction",
        "entry_price",
        "exit_price",
        "size",
        "pnl_amount",
        "pnl_pct",
        "exit_reason",
        "entry_bar",
        "exit_bar",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_date.to_string(),
            &t.exit_date.to_string(),
            &t.level.level().to_string(),
            &format!("{:?}", t.direction).to_lowercase(),
            &format!("{:.6}", t.entry_price),
            &format!("{:.6}", t.exit_price),
            &format!("{:.8}", t.size),
            &format!("{:.2}", t.pnl_amount),
            &format!("{:.6}", t.pnl_pct),
            &t.exit_reason.to_string(),
            &t.entry_bar.to_string(),
            &t.exit_bar.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the equity curve as CSV, one row per bar.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "price",
        "cash",
        "position",
        "total_value",
        "drawdown_pct",
    ])?;
    for p in equity_curve {
        wtr.write_record([
            &p.date.to_string(),
            &format!("{:.6}", p.price),
            &format!("{:.2}", p.cash),
            &format!("{:.2}", p.position),
            &format!("{:.2}", p.total_value),
            &format!("{:.6}", p.drawdown_pct),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{name}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: trade tape
/// - `equity.csv`: bar-by-bar equity curve
/// - `report.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = timestamped_dir(output_dir, &result.name)?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)
        .context("failed to write manifest.json")?;
    std::fs::write(
        run_dir.join("trades.csv"),
        export_trades_csv(&result.trades)?,
    )
    .context("failed to write trades.csv")?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.equity_curve)?,
    )
    .context("failed to write equity.csv")?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))
        .context("failed to write report.md")?;

    info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

/// Save a sweep's ranked leaderboard as `leaderboard.csv` and `report.md`.
pub fn save_sweep_artifacts(
    results: &SweepResults,
    name: &str,
    output_dir: &Path,
    top: usize,
) -> Result<PathBuf> {
    let sweep_dir = timestamped_dir(output_dir, &format!("{name}_sweep"))?;
    std::fs::write(
        sweep_dir.join("leaderboard.csv"),
        export_leaderboard_csv(results)?,
    )
    .context("failed to write leaderboard.csv")?;
    std::fs::write(
        sweep_dir.join("report.md"),
        generate_sweep_report(results, top),
    )
    .context("failed to write report.md")?;

    info!(dir = %sweep_dir.display(), runs = results.len(), "sweep artifacts saved");
    Ok(sweep_dir)
}

/// Every sweep run, best first, with its parameters and headline metrics.
pub fn export_leaderboard_csv(results: &SweepResults) -> Result<String> {
    let metric = results.metric();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "run_id",
        "tier1_oversold",
        "stop_pct",
        "atr_multiplier",
        "partial_tp_threshold",
        "max_drawdown_limit",
        "fitness",
        "total_return",
        "cagr",
        "sharpe",
        "max_drawdown",
        "trades",
    ])?;
    for (rank, run) in results.sorted_by_fitness().into_iter().enumerate() {
        let p = &run.point;
        let m = &run.result.metrics;
        wtr.write_record([
            &(rank + 1).to_string(),
            &run.result.run_id,
            &p.tier1_oversold.to_string(),
            &p.stop_pct.to_string(),
            &p.atr_multiplier.to_string(),
            &p.partial_tp_threshold.to_string(),
            &p.max_drawdown.to_string(),
            &format!("{:.6}", metric.extract(m)),
            &format!("{:.6}", m.total_return),
            &format!("{:.6}", m.cagr),
            &format!("{:.6}", m.sharpe),
            &format!("{:.6}", m.max_drawdown),
            &m.trade_count.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Name | {} |\n", result.name));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!(
        "| Initial Capital | ${:.0} |\n",
        result.initial_capital
    ));
    md.push_str(&format!("| Final Value | ${:.2} |\n", result.final_value));
    md.push_str(&format!(
        "| Bars | {} ({} entry warmup, indicators ready at {}) |\n",
        result.bar_count, result.warmup_bars, result.indicator_warmup
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Strategy\n\n");
    md.push_str(&format!(
        "- **Direction**: {:?}\n",
        result.config.direction
    ));
    for rule in &result.config.tiers {
        md.push_str(&format!(
            "- **{}**: {:.0}% of value, stop {:.1}%, {} condition(s)\n",
            rule.tier,
            rule.size_fraction * 100.0,
            rule.stop_pct * 100.0,
            rule.conditions.len()
        ));
    }
    let risk = &result.config.risk;
    md.push_str(&format!(
        "- **Risk**: breaker {:.0}%, ATR trail {:.1}x, partial TP at {:.0}% selling {:.0}%\n",
        risk.max_drawdown * 100.0,
        risk.atr_multiplier,
        risk.partial_tp_threshold * 100.0,
        risk.partial_fraction * 100.0
    ));
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        m.total_return * 100.0
    ));
    md.push_str(&format!("| CAGR | {:.2}% |\n", m.cagr * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.calmar));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        m.max_drawdown * 100.0
    ));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!(
        "| Avg Trade Return | {:.2}% |\n",
        m.avg_trade_return * 100.0
    ));
    md.push_str(&format!("| Avg Bars Held | {:.1} |\n", m.avg_bars_held));
    md.push_str(&format!("| Exposure | {:.1}% |\n", m.exposure * 100.0));
    md.push_str(&format!("| Breaker Trips | {} |\n", result.breaker_trips));
    md.push_str(&format!(
        "| Skipped Entries | {} |\n",
        result.skipped_entries
    ));
    md.push('\n');

    md.push_str("## Exits\n\n");
    md.push_str("| Reason | Count |\n");
    md.push_str("| --- | ---: |\n");
    for reason in ExitReason::ALL {
        md.push_str(&format!("| {} | {} |\n", reason, m.exit_count(reason)));
    }
    md.push('\n');

    md.push_str("## Tiers\n\n");
    md.push_str("| Tier | Closes | Realized PnL |\n");
    md.push_str("| --- | ---: | ---: |\n");
    for tier in EntryTier::ALL {
        let closes: Vec<&Trade> = result.trades.iter().filter(|t| t.level == tier).collect();
        let pnl: f64 = closes.iter().map(|t| t.pnl_amount).sum();
        md.push_str(&format!("| {} | {} | {:.2} |\n", tier, closes.len(), pnl));
    }
    md.push('\n');

    md
}

/// Generate a Markdown leaderboard for the top `top` sweep runs.
pub fn generate_sweep_report(results: &SweepResults, top: usize) -> String {
    let metric = results.metric();
    let mut md = String::with_capacity(2048);

    md.push_str("# Sweep Report\n\n");
    md.push_str(&format!(
        "{} runs ranked by {:?}.\n\n",
        results.len(),
        metric
    ));
    md.push_str("| Rank | Parameters | Fitness | Return | Sharpe | Max DD | Trades |\n");
    md.push_str("| ---: | --- | ---: | ---: | ---: | ---: | ---: |\n");
    for (rank, run) in results.top_n(top).into_iter().enumerate() {
        let m = &run.result.metrics;
        md.push_str(&format!(
            "| {} | {} | {:.3} | {:.2}% | {:.3} | {:.2}% | {} |\n",
            rank + 1,
            run.point.label(),
            metric.extract(m),
            m.total_return * 100.0,
            m.sharpe,
            m.max_drawdown * 100.0,
            m.trade_count
        ));
    }
    md.push('\n');

    md
}

// ─── Helpers ────────────────────────────────────────────────────────

fn timestamped_dir(output_dir: &Path, prefix: &str) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        prefix,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let dir = output_dir.join(dirname);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tierlab_core::domain::Direction;
    use tierlab_core::StrategyConfig;

    use crate::metrics::PerformanceMetrics;

    // ─── Test helpers ────────────────────────────────────────────────

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sample_trade() -> Trade {
        Trade {
            entry_date: date(1),
            entry_bar: 0,
            level: EntryTier::Two,
            direction: Direction::Long,
            entry_price: 60_000.0,
            exit_date: date(4),
            exit_bar: 3,
            exit_price: 66_000.0,
            exit_reason: ExitReason::PartialTp,
            size: 0.05,
            pnl_amount: 300.0,
            pnl_pct: 0.1,
        }
    }

    fn sample_curve() -> Vec<EquityPoint> {
        [10_000.0, 10_100.0, 9_950.0, 10_300.0]
            .iter()
            .enumerate()
            .map(|(i, &total_value)| EquityPoint {
                date: date(i as u32 + 1),
                price: 60_000.0,
                cash: total_value - 3_000.0,
                position: 3_000.0,
                total_value,
                drawdown_pct: 0.0,
            })
            .collect()
    }

    fn sample_result() -> BacktestResult {
        let trades = vec![sample_trade()];
        let equity_curve = sample_curve();
        let values: Vec<f64> = equity_curve.iter().map(|p| p.total_value).collect();
        BacktestResult {
            schema_version: SCHEMA_VERSION,
            name: "btc_daily".into(),
            run_id: "f00d".into(),
            dataset_hash: "abc123".into(),
            has_synthetic: false,
            metrics: PerformanceMetrics::compute(&values, &trades),
            trades,
            equity_curve,
            config: StrategyConfig::default(),
            start_date: date(1),
            end_date: date(4),
            initial_capital: 10_000.0,
            final_value: 10_300.0,
            bar_count: 4,
            warmup_bars: 0,
            indicator_warmup: 2,
            breaker_trips: 0,
            skipped_entries: 1,
        }
    }

    // ─── JSON round-trip ─────────────────────────────────────────────

    #[test]
    fn json_roundtrip() {
        let original = sample_result();
        let json = export_json(&original).unwrap();
        let restored = import_json(&json).unwrap();
        assert_eq!(restored.schema_version, SCHEMA_VERSION);
        assert_eq!(restored.name, original.name);
        assert_eq!(restored.trades, original.trades);
        assert_eq!(restored.equity_curve, original.equity_curve);
        assert_eq!(restored.config, original.config);
        assert_eq!(restored.metrics.exit_counts, original.metrics.exit_counts);
        assert!((restored.metrics.sharpe - original.metrics.sharpe).abs() < 1e-10);
        assert!(json.contains("\"PARTIAL_TP\""));
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut result = sample_result();
        result.schema_version = 99;
        let json = export_json(&result).unwrap();
        let msg = import_json(&json).unwrap_err().to_string();
        assert!(msg.contains("unsupported schema version 99"));
    }

    // ─── CSV ────────────────────────────────────────────────────────

    #[test]
    fn csv_trades_header_and_row() {
        let csv = export_trades_csv(&[sample_trade()]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "entry_date,exit_date,level,direction,entry_price,exit_price,size,pnl_amount,pnl_pct,exit_reason,entry_bar,exit_bar"
        );
        assert_eq!(
            lines[1],
            "2024-03-01,2024-03-04,2,long,60000.000000,66000.000000,0.05000000,300.00,0.100000,PARTIAL_TP,0,3"
        );
    }

    #[test]
    fn csv_empty_trades() {
        let csv = export_trades_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn csv_equity_rows() {
        let csv = export_equity_csv(&sample_curve()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "date,price,cash,position,total_value,drawdown_pct");
        assert!(lines[1].starts_with("2024-03-01,60000.000000,7000.00,3000.00,10000.00"));
    }

    // ─── Markdown ───────────────────────────────────────────────────

    #[test]
    fn markdown_report_has_sections() {
        let md = generate_report(&sample_result());
        assert!(md.contains("# Backtest Report"));
        assert!(md.contains("## Metadata"));
        assert!(md.contains("## Strategy"));
        assert!(md.contains("## Performance Summary"));
        assert!(md.contains("| PARTIAL_TP | 1 |"));
        assert!(md.contains("| T2 | 1 | 300.00 |"));
        assert!(md.contains("| Skipped Entries | 1 |"));
        assert!(!md.contains("SYNTHETIC"));
    }

    #[test]
    fn markdown_report_flags_synthetic() {
        let mut result = sample_result();
        result.has_synthetic = true;
        assert!(generate_report(&result).contains("**SYNTHETIC**"));
    }

    // ─── Save/load artifacts ────────────────────────────────────────

    #[test]
    fn save_load_artifacts_roundtrip() {
        let result = sample_result();
        let dir = tempfile::tempdir().unwrap();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();

        for file in ["manifest.json", "trades.csv", "equity.csv", "report.md"] {
            assert!(run_dir.join(file).exists(), "{file} missing");
        }
        assert!(run_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("btc_daily_"));
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.run_id, result.run_id);
        assert_eq!(loaded.trades, result.trades);
    }

    #[test]
    fn load_artifacts_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_artifacts(dir.path()).is_err());
    }
}
