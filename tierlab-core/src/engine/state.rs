//! Engine configuration, mutable state, and run result types.

use crate::domain::{
    EquityPoint, ExitReason, Portfolio, PositionTier, Trade, SIZE_EPSILON,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// No entries before this bar index. Exits are always processed.
    pub warmup_bars: usize,
}

impl EngineConfig {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            warmup_bars: 0,
        }
    }

    pub fn with_warmup(initial_capital: f64, warmup_bars: usize) -> Self {
        Self {
            initial_capital,
            warmup_bars,
        }
    }
}

/// Mutable state that evolves bar-by-bar during the engine loop.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub portfolio: Portfolio,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Index of the next bar to process.
    pub bar_index: usize,
    /// All-time high of total value, the reference for reported drawdown.
    pub high_water_mark: f64,
    pub breaker_trips: usize,
    /// Entries skipped because free capital could not cover them.
    pub skipped_entries: usize,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            bar_index: 0,
            high_water_mark: initial_capital,
            breaker_trips: 0,
            skipped_entries: 0,
        }
    }

    /// Book a new tier: debit (long) or credit (short) cash and mark the cycle.
    pub fn open_tier(&mut self, tier: PositionTier) {
        self.portfolio.cash -= tier.direction.sign() * tier.size * tier.entry_price;
        self.portfolio.cycle.mark_entered(tier.level);
        debug!(
            tier = %tier.level,
            date = %tier.entry_date,
            price = tier.entry_price,
            size = tier.size,
            "tier opened"
        );
        self.portfolio.open_tiers.push(tier);
    }

    /// Close `size` units of the tier at `index` and append the trade.
    ///
    /// A close that would leave less than `SIZE_EPSILON` behind takes the
    /// whole remainder, so no dust is ever written off.
    pub fn close_units(
        &mut self,
        index: usize,
        size: f64,
        price: f64,
        bar_index: usize,
        date: NaiveDate,
        reason: ExitReason,
    ) {
        let tier = &mut self.portfolio.open_tiers[index];
        let size = if tier.remaining_size - size < SIZE_EPSILON {
            tier.remaining_size
        } else {
            size
        };
        if size <= 0.0 {
            return;
        }

        let trade = Trade::from_close(tier, bar_index, date, price, size, reason);
        tier.remaining_size -= size;
        self.portfolio.cash += tier.direction.sign() * size * price;

        debug!(
            tier = %trade.level,
            date = %date,
            price,
            size,
            pnl = trade.pnl_amount,
            reason = %reason,
            "tier closed"
        );
        self.trades.push(trade);
    }

    /// Close every open tier in full at `price`.
    pub fn close_all(&mut self, price: f64, bar_index: usize, date: NaiveDate, reason: ExitReason) {
        for index in 0..self.portfolio.open_tiers.len() {
            let remaining = self.portfolio.open_tiers[index].remaining_size;
            if remaining > 0.0 {
                self.close_units(index, remaining, price, bar_index, date, reason);
            }
        }
    }

    /// Verify the accounting identity and return total value at `price`.
    ///
    /// Panics in debug mode if the identity is violated.
    pub fn verify_equity(&self, price: f64) -> f64 {
        let total = self.portfolio.total_value(price);

        #[cfg(debug_assertions)]
        {
            let position_value: f64 = self
                .portfolio
                .open_tiers
                .iter()
                .map(|t| t.signed_units() * price)
                .sum();
            let expected = self.portfolio.cash + position_value;
            assert!(
                (total - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                "equity accounting violated: total={total}, cash={} + positions={position_value} = {expected}",
                self.portfolio.cash
            );
        }

        total
    }

    /// Mark to market at the bar's close and append an equity point.
    pub fn mark_to_market(&mut self, date: NaiveDate, price: f64) {
        let total_value = self.verify_equity(price);
        self.high_water_mark = self.high_water_mark.max(total_value);
        self.portfolio.peak_equity = self.portfolio.peak_equity.max(total_value);

        let drawdown_pct = if self.high_water_mark > 0.0 {
            (self.high_water_mark - total_value) / self.high_water_mark
        } else {
            0.0
        };
        self.equity_curve.push(EquityPoint {
            date,
            price,
            cash: self.portfolio.cash,
            position: self.portfolio.position_value(price),
            total_value,
            drawdown_pct,
        });
    }
}

/// Result of a completed backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub initial_capital: f64,
    pub final_value: f64,
    /// First bar at which every indicator was defined.
    pub indicator_warmup: usize,
    pub breaker_trips: usize,
    pub skipped_entries: usize,
}

impl RunResult {
    pub fn total_return(&self) -> f64 {
        if self.initial_capital == 0.0 {
            return 0.0;
        }
        self.final_value / self.initial_capital - 1.0
    }

    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl_amount).sum()
    }

    pub fn trades_with(&self, reason: ExitReason) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(move |t| t.exit_reason == reason)
    }

    pub fn max_drawdown(&self) -> f64 {
        self.equity_curve
            .iter()
            .map(|p| p.drawdown_pct)
            .fold(0.0, f64::max)
    }
}
