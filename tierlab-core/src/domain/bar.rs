//! Bar: the fundamental market data unit, plus input series validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daily OHLCV bar.
///
/// Volume is fractional because crypto venues report base-asset volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: finite, positive prices and a consistent range.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite();
        finite
            && self.high >= self.low
            && self.open > 0.0
            && self.high > 0.0
            && self.low > 0.0
            && self.close > 0.0
    }

    /// Typical price `(high + low + close) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Fatal input-series errors. Detected before the bar loop starts; a series
/// that fails validation produces no trades.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("bar series is empty")]
    Empty,

    #[error("dates not strictly ascending at bar {index}: {prev} then {date}")]
    NonMonotonicDate {
        index: usize,
        prev: NaiveDate,
        date: NaiveDate,
    },

    #[error("duplicate date {date} at bar {index}")]
    DuplicateDate { index: usize, date: NaiveDate },

    #[error("bar {index} ({date}) has a non-positive or non-finite price")]
    InvalidPrice { index: usize, date: NaiveDate },

    #[error("bar {index} ({date}) has high {high} below low {low}")]
    InvertedRange {
        index: usize,
        date: NaiveDate,
        high: f64,
        low: f64,
    },
}

/// Validate an input series: non-empty, strictly ascending unique dates,
/// and sane positive prices on every bar.
pub fn validate_bars(bars: &[Bar]) -> Result<(), InputError> {
    if bars.is_empty() {
        return Err(InputError::Empty);
    }

    for (index, bar) in bars.iter().enumerate() {
        let finite_positive = [bar.open, bar.high, bar.low, bar.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0);
        if !finite_positive {
            return Err(InputError::InvalidPrice {
                index,
                date: bar.date,
            });
        }
        if bar.high < bar.low {
            return Err(InputError::InvertedRange {
                index,
                date: bar.date,
                high: bar.high,
                low: bar.low,
            });
        }

        if index > 0 {
            let prev = bars[index - 1].date;
            if bar.date == prev {
                return Err(InputError::DuplicateDate {
                    index,
                    date: bar.date,
                });
            }
            if bar.date < prev {
                return Err(InputError::NonMonotonicDate {
                    index,
                    prev,
                    date: bar.date,
                });
            }
        }
    }

    Ok(())
}
