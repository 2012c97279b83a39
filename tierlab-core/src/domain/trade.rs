//! Trade: one realized close (full or partial) of a position tier.

use super::position::{Direction, EntryTier, PositionTier};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a tier (or part of it) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    PartialTp,
    AtrTrail,
    TrendExit,
    DrawdownStop,
    PeriodEnd,
}

impl ExitReason {
    pub const ALL: [ExitReason; 6] = [
        ExitReason::StopLoss,
        ExitReason::PartialTp,
        ExitReason::AtrTrail,
        ExitReason::TrendExit,
        ExitReason::DrawdownStop,
        ExitReason::PeriodEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::PartialTp => "PARTIAL_TP",
            ExitReason::AtrTrail => "ATR_TRAIL",
            ExitReason::TrendExit => "TREND_EXIT",
            ExitReason::DrawdownStop => "DRAWDOWN_STOP",
            ExitReason::PeriodEnd => "PERIOD_END",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record appended on every full or partial close.
///
/// `pnl_pct` is a fraction of the entry price (0.05 = 5%), signed so that a
/// profitable short is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_date: NaiveDate,
    pub entry_bar: usize,
    pub level: EntryTier,
    pub direction: Direction,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_date: NaiveDate,
    pub exit_bar: usize,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size & PnL ──
    pub size: f64,
    pub pnl_amount: f64,
    pub pnl_pct: f64,
}

impl Trade {
    /// Build the record for closing `size` units of `tier` at `exit_price`.
    pub fn from_close(
        tier: &PositionTier,
        exit_bar: usize,
        exit_date: NaiveDate,
        exit_price: f64,
        size: f64,
        exit_reason: ExitReason,
    ) -> Self {
        let sign = tier.direction.sign();
        Self {
            entry_date: tier.entry_date,
            entry_bar: tier.entry_bar,
            level: tier.level,
            direction: tier.direction,
            entry_price: tier.entry_price,
            exit_date,
            exit_bar,
            exit_price,
            exit_reason,
            size,
            pnl_amount: sign * (exit_price - tier.entry_price) * size,
            pnl_pct: sign * (exit_price / tier.entry_price - 1.0),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl_amount > 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}
