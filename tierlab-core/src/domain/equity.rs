//! EquityPoint: one mark-to-market sample per bar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio snapshot at a bar's close.
///
/// `position` is the signed market value of all open tiers and
/// `drawdown_pct` is the fractional decline from the running high-water mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub price: f64,
    pub cash: f64,
    pub position: f64,
    pub total_value: f64,
    pub drawdown_pct: f64,
}

impl EquityPoint {
    /// Residual of the accounting identity; zero up to float error.
    pub fn identity_residual(&self) -> f64 {
        self.total_value - (self.cash + self.position)
    }
}
