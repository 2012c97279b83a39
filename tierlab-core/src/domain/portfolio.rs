//! Portfolio: cash plus the open tiers of the ladder.

use super::position::{CycleState, PositionTier};

/// Aggregate portfolio state for a single-instrument tier ladder.
///
/// The accounting identity must hold at every bar:
/// `total_value == cash + Σ signed remaining_size × price`.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub open_tiers: Vec<PositionTier>,
    /// Reference high for the drawdown circuit breaker.
    pub peak_equity: f64,
    pub cycle: CycleState,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            open_tiers: Vec::new(),
            peak_equity: initial_capital,
            cycle: CycleState::new(),
        }
    }

    /// Signed market value of all open tiers.
    pub fn position_value(&self, price: f64) -> f64 {
        self.open_tiers.iter().map(|t| t.market_value(price)).sum()
    }

    pub fn total_value(&self, price: f64) -> f64 {
        self.cash + self.position_value(price)
    }

    /// Unsigned notional of all open tiers.
    pub fn gross_exposure(&self, price: f64) -> f64 {
        self.open_tiers.iter().map(|t| t.exposure(price)).sum()
    }

    /// Capital not committed to open tiers. Equals cash for a long-only book.
    pub fn free_capital(&self, price: f64) -> f64 {
        self.total_value(price) - self.gross_exposure(price)
    }

    /// Fractional drawdown of `total_value` from the breaker's peak.
    pub fn breaker_drawdown(&self, total_value: f64) -> f64 {
        if self.peak_equity <= 0.0 {
            return 0.0;
        }
        (self.peak_equity - total_value) / self.peak_equity
    }

    pub fn has_open_tiers(&self) -> bool {
        !self.open_tiers.is_empty()
    }

    /// Drop tiers whose remaining size fell below the epsilon.
    pub fn sweep_closed(&mut self) {
        self.open_tiers.retain(|t| !t.is_closed());
    }

    /// Reset the cycle once every tier is flat. Returns true if it reset.
    pub fn reset_cycle_if_flat(&mut self) -> bool {
        if self.open_tiers.is_empty() && !self.cycle.is_empty() {
            self.cycle.reset();
            return true;
        }
        false
    }
}
