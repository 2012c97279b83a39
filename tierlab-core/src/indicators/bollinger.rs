//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::sma::sma_of_series;
use super::{closes, Bands};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self { period, multiplier }
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    pub fn bands(&self, bars: &[Bar]) -> Bands {
        let values = closes(bars);
        let n = values.len();
        let middle = sma_of_series(&values, self.period);
        let mut upper = vec![f64::NAN; n];
        let mut lower = vec![f64::NAN; n];

        for i in 0..n {
            let mean = middle[i];
            if mean.is_nan() {
                continue;
            }
            let window = &values[i + 1 - self.period..=i];
            let variance = window
                .iter()
                .map(|v| {
                    let diff = v - mean;
                    diff * diff
                })
                .sum::<f64>()
                / self.period as f64;
            let width = self.multiplier * variance.sqrt();
            upper[i] = mean + width;
            lower[i] = mean - width;
        }

        Bands {
            upper,
            middle,
            lower,
        }
    }
}
