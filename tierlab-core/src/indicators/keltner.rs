//! Keltner Channel, squeeze flavour: SMA +/- multiplier × SMA(true range).
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * SMA(TR, period)
//! - Lower: middle - mult * SMA(TR, period)
//!
//! Lookback: period - 1. TR[0] is high-low, so the channel is defined as soon
//! as the close SMA is.

use super::atr::true_range;
use super::sma::sma_of_series;
use super::{closes, Bands};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Keltner {
    period: usize,
    multiplier: f64,
}

impl Keltner {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Keltner period must be >= 1");
        Self { period, multiplier }
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    pub fn bands(&self, bars: &[Bar]) -> Bands {
        let middle = sma_of_series(&closes(bars), self.period);
        let range_ma = sma_of_series(&true_range(bars), self.period);

        let (upper, lower) = middle
            .iter()
            .zip(&range_ma)
            .map(|(&mid, &range)| {
                let width = self.multiplier * range;
                (mid + width, mid - width)
            })
            .unzip();

        Bands {
            upper,
            middle,
            lower,
        }
    }
}
