//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Annualization uses 365 bars per year because the market trades every day.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tierlab_core::domain::{EquityPoint, ExitReason, Trade};
use tierlab_core::RunResult;

/// Daily bars per year for a market without weekends or holidays.
pub const BARS_PER_YEAR: f64 = 365.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    /// Negative fraction (-0.15 = 15% below the running peak).
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Number of trade records; each partial close counts once.
    pub trade_count: usize,
    pub avg_trade_return: f64,
    pub avg_bars_held: f64,
    /// Fraction of bars that ended with an open position.
    pub exposure: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    /// Trade records per exit reason, keyed by the reason's wire name.
    pub exit_counts: BTreeMap<String, usize>,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    pub fn compute(equity_curve: &[f64], trades: &[Trade]) -> Self {
        let bars = equity_curve.len();
        Self {
            total_return: total_return(equity_curve),
            cagr: cagr(equity_curve, bars),
            sharpe: sharpe_ratio(equity_curve, 0.0),
            sortino: sortino_ratio(equity_curve, 0.0),
            calmar: calmar_ratio(equity_curve, bars),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            avg_trade_return: avg_trade_return(trades),
            avg_bars_held: avg_bars_held(trades),
            exposure: 0.0,
            max_consecutive_wins: max_consecutive_wins(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            exit_counts: exit_counts(trades),
        }
    }

    /// Metrics for a finished engine run, including market exposure.
    pub fn from_run(result: &RunResult) -> Self {
        let values: Vec<f64> = result.equity_curve.iter().map(|p| p.total_value).collect();
        Self {
            exposure: exposure(&result.equity_curve),
            ..Self::compute(&values, &result.trades)
        }
    }

    pub fn exit_count(&self, reason: ExitReason) -> usize {
        self.exit_counts.get(reason.as_str()).copied().unwrap_or(0)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = equity_curve[equity_curve.len() - 1];
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Compound Annual Growth Rate over `bars` daily bars.
///
/// Returns 0.0 for single-bar or constant equity.
pub fn cagr(equity_curve: &[f64], bars: usize) -> f64 {
    if equity_curve.len() < 2 || bars < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = equity_curve[equity_curve.len() - 1];
    if initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = bars as f64 / BARS_PER_YEAR;
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from daily returns.
///
/// Sharpe = mean(daily returns - rf) / std(daily returns) * sqrt(365).
/// Returns 0.0 if variance is zero or fewer than 2 bars.
pub fn sharpe_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / BARS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let mean = mean_f64(&excess);
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * BARS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there are no down days or fewer than 2 bars.
pub fn sortino_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / BARS_PER_YEAR;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let mean = mean_f64(&excess);

    let downside_sq: f64 = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq <= 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean / downside_std) * BARS_PER_YEAR.sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|.
///
/// Returns 0.0 if max drawdown is zero or CAGR is non-positive.
pub fn calmar_ratio(equity_curve: &[f64], bars: usize) -> f64 {
    let c = cagr(equity_curve, bars);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Win rate: fraction of trade records that made money.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.pnl_amount > 0.0)
        .map(|t| t.pnl_amount)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl_amount < 0.0)
        .map(|t| t.pnl_amount.abs())
        .sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Mean `pnl_pct` over trade records.
pub fn avg_trade_return(trades: &[Trade]) -> f64 {
    let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
    mean_f64(&returns)
}

pub fn avg_bars_held(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.bars_held()).sum::<usize>() as f64 / trades.len() as f64
}

/// Fraction of equity points that carry a non-zero position.
pub fn exposure(points: &[EquityPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let invested = points.iter().filter(|p| p.position != 0.0).count();
    invested as f64 / points.len() as f64
}

/// Trade records per exit reason. Every reason is present, zero or not.
pub fn exit_counts(trades: &[Trade]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = ExitReason::ALL
        .iter()
        .map(|r| (r.as_str().to_string(), 0))
        .collect();
    for trade in trades {
        *counts
            .entry(trade.exit_reason.as_str().to_string())
            .or_default() += 1;
    }
    counts
}

/// Maximum consecutive winning trades.
pub fn max_consecutive_wins(trades: &[Trade]) -> usize {
    max_consecutive(trades, true)
}

/// Maximum consecutive losing trades.
pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    max_consecutive(trades, false)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Compute daily returns from an equity curve.
pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
