//! Bar-by-bar loop: the tier ladder state machine.
//!
//! Fixed order per bar:
//! 1. Drawdown circuit breaker
//! 2. Fixed stop-loss per tier
//! 3. Partial take-profit per tier
//! 4. ATR trailing stop per tier
//! 5. Trend exit for the whole ladder
//! 6. New entries, tiers 1..4 in order
//! 7. Mark-to-market
//!
//! On the last bar no entries open and every remaining tier closes with
//! `PERIOD_END` before the final equity point is written.

use super::state::{EngineConfig, EngineState, RunResult};
use super::EngineError;
use crate::domain::{validate_bars, Bar, ExitReason, PositionTier};
use crate::indicators::IndicatorFrame;
use crate::signals::{self, SignalContext, SignalSet, TierRule};
use crate::strategy::StrategyConfig;
use tracing::{debug, info, warn};

/// Free capital may fall short of a notional by this much and still fill.
const CASH_EPSILON: f64 = 1e-9;

/// A backtest in progress. Drive it with `step` or consume it with `run`.
pub struct Backtest<'a> {
    bars: &'a [Bar],
    frame: &'a IndicatorFrame,
    strategy: &'a StrategyConfig,
    config: EngineConfig,
    pub state: EngineState,
}

impl<'a> Backtest<'a> {
    /// Validates the bar series, the strategy and the frame alignment.
    pub fn new(
        bars: &'a [Bar],
        frame: &'a IndicatorFrame,
        strategy: &'a StrategyConfig,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        validate_bars(bars)?;
        strategy.validate()?;
        if frame.len() != bars.len() {
            return Err(EngineError::FrameMismatch {
                bars: bars.len(),
                rows: frame.len(),
            });
        }
        if !(config.initial_capital.is_finite() && config.initial_capital > 0.0) {
            return Err(EngineError::InvalidCapital(config.initial_capital));
        }

        let state = EngineState::new(config.initial_capital);
        Ok(Self {
            bars,
            frame,
            strategy,
            config,
            state,
        })
    }

    pub fn is_done(&self) -> bool {
        self.state.bar_index >= self.bars.len()
    }

    /// Process the next bar. Returns false once every bar has been consumed.
    pub fn step(&mut self) -> bool {
        if self.is_done() {
            return false;
        }
        let t = self.state.bar_index;
        let bars = self.bars;
        let frame = self.frame;
        let bar = &bars[t];
        let (row, prev) = match frame.row(t) {
            Some(row) => (row, t.checked_sub(1).and_then(|p| frame.row(p))),
            None => return false,
        };
        let ctx = SignalContext { bar, row, prev };
        let signals = signals::evaluate(&self.strategy.tiers, &self.strategy.exits, &ctx);
        let is_last = t + 1 == bars.len();

        let tripped = self.drawdown_breaker(t, bar);
        self.stop_losses(t, bar);
        self.partial_take_profits(t, bar, &signals);
        self.atr_trails(t, bar, row.atr);
        if signals.trend_exit && self.state.portfolio.has_open_tiers() {
            self.state.close_all(bar.close, t, bar.date, ExitReason::TrendExit);
        }
        self.settle();

        if !tripped && !is_last && t >= self.config.warmup_bars {
            self.entries(t, bar, row.atr, &signals);
        }

        if is_last && self.state.portfolio.has_open_tiers() {
            self.state.close_all(bar.close, t, bar.date, ExitReason::PeriodEnd);
            self.settle();
        }

        self.state.mark_to_market(bar.date, bar.close);
        self.state.bar_index += 1;
        true
    }

    /// Run every remaining bar and return the result.
    pub fn run(mut self) -> RunResult {
        while self.step() {}
        self.finish()
    }

    pub fn finish(self) -> RunResult {
        let final_value = self
            .state
            .equity_curve
            .last()
            .map(|p| p.total_value)
            .unwrap_or(self.config.initial_capital);
        RunResult {
            trades: self.state.trades,
            equity_curve: self.state.equity_curve,
            initial_capital: self.config.initial_capital,
            final_value,
            indicator_warmup: self.frame.warmup(),
            breaker_trips: self.state.breaker_trips,
            skipped_entries: self.state.skipped_entries,
        }
    }

    // ─── Step 1 ───
    fn drawdown_breaker(&mut self, t: usize, bar: &Bar) -> bool {
        if !self.state.portfolio.has_open_tiers() {
            return false;
        }
        let total = self.state.portfolio.total_value(bar.close);
        let drawdown = self.state.portfolio.breaker_drawdown(total);
        if drawdown <= self.strategy.risk.max_drawdown {
            return false;
        }

        warn!(
            date = %bar.date,
            drawdown,
            limit = self.strategy.risk.max_drawdown,
            "drawdown breaker tripped, closing all tiers"
        );
        self.state
            .close_all(bar.close, t, bar.date, ExitReason::DrawdownStop);
        self.settle();
        // Re-arm against the post-trip value.
        self.state.portfolio.peak_equity = self.state.portfolio.total_value(bar.close);
        self.state.breaker_trips += 1;
        true
    }

    // ─── Step 2 ───
    fn stop_losses(&mut self, t: usize, bar: &Bar) {
        for index in 0..self.state.portfolio.open_tiers.len() {
            let tier = &self.state.portfolio.open_tiers[index];
            if tier.is_closed() || !tier.stop_breached(bar.low, bar.high) {
                continue;
            }
            if let Some(stop) = tier.stop_price {
                let remaining = tier.remaining_size;
                self.state
                    .close_units(index, remaining, stop, t, bar.date, ExitReason::StopLoss);
            }
        }
    }

    // ─── Step 3 ───
    fn partial_take_profits(&mut self, t: usize, bar: &Bar, signals: &SignalSet) {
        let risk = &self.strategy.risk;
        if signals.exit_count < self.strategy.exits.partial_min_signals {
            return;
        }
        for index in 0..self.state.portfolio.open_tiers.len() {
            let tier = &self.state.portfolio.open_tiers[index];
            if tier.is_closed()
                || tier.partial_exit_done
                || tier.unrealized_return(bar.close) < risk.partial_tp_threshold
            {
                continue;
            }
            let size = tier.remaining_size * risk.partial_fraction;
            self.state
                .close_units(index, size, bar.close, t, bar.date, ExitReason::PartialTp);
            self.state.portfolio.open_tiers[index].partial_exit_done = true;
        }
    }

    // ─── Step 4 ───
    fn atr_trails(&mut self, t: usize, bar: &Bar, atr: f64) {
        let multiplier = self.strategy.risk.atr_multiplier;
        for index in 0..self.state.portfolio.open_tiers.len() {
            let tier = &mut self.state.portfolio.open_tiers[index];
            if tier.is_closed() {
                continue;
            }
            tier.ratchet_trail(bar.close, atr, multiplier);
            if tier.trail_crossed(bar.close) {
                let remaining = tier.remaining_size;
                self.state
                    .close_units(index, remaining, bar.close, t, bar.date, ExitReason::AtrTrail);
            }
        }
    }

    // ─── Step 6 ───
    fn entries(&mut self, t: usize, bar: &Bar, atr: f64, signals: &SignalSet) {
        let strategy = self.strategy;
        for rule in &strategy.tiers {
            if !signals.entry(rule.tier) || !self.state.portfolio.cycle.is_unlocked(rule.tier) {
                continue;
            }
            self.try_open(rule, t, bar, atr);
        }
    }

    fn try_open(&mut self, rule: &TierRule, t: usize, bar: &Bar, atr: f64) {
        let direction = self.strategy.direction;
        let total = self.state.portfolio.total_value(bar.close);
        let notional = rule.size_fraction * total;
        let free = self.state.portfolio.free_capital(bar.close);
        if notional <= 0.0 || notional > free + CASH_EPSILON {
            debug!(
                tier = %rule.tier,
                date = %bar.date,
                notional,
                free,
                "entry skipped: insufficient funds"
            );
            self.state.skipped_entries += 1;
            return;
        }

        let initial_trail = if atr.is_nan() {
            None
        } else {
            Some(bar.close - direction.sign() * self.strategy.risk.atr_multiplier * atr)
        };
        let tier = PositionTier::open(
            rule.tier,
            direction,
            t,
            bar.date,
            bar.close,
            notional / bar.close,
            rule.stop_pct,
            initial_trail,
        );
        self.state.open_tier(tier);
    }

    /// Drop flat tiers and reset the cycle once the ladder is empty.
    fn settle(&mut self) {
        self.state.portfolio.sweep_closed();
        if self.state.portfolio.reset_cycle_if_flat() {
            debug!(bar = self.state.bar_index, "cycle reset");
        }
    }
}

/// Validate inputs, compute the indicator frame and run the whole series.
pub fn run_backtest(
    bars: &[Bar],
    strategy: &StrategyConfig,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    validate_bars(bars)?;
    strategy.validate()?;
    let frame = IndicatorFrame::compute(bars, &strategy.indicators);
    run_with_frame(bars, &frame, strategy, config)
}

/// Run against a precomputed frame (shared across sweeps over risk params).
pub fn run_with_frame(
    bars: &[Bar],
    frame: &IndicatorFrame,
    strategy: &StrategyConfig,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    let backtest = Backtest::new(bars, frame, strategy, config.clone())?;
    info!(
        bars = bars.len(),
        direction = ?strategy.direction,
        tiers = strategy.tiers.len(),
        capital = config.initial_capital,
        "backtest started"
    );
    let result = backtest.run();
    info!(
        trades = result.trades.len(),
        final_value = result.final_value,
        breaker_trips = result.breaker_trips,
        "backtest finished"
    );
    Ok(result)
}
