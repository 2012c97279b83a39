//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window. Any NaN inside the window yields NaN,
//! so a leading undefined prefix in a derived series shifts the warm-up.
//! Lookback: period - 1 (first valid value at index period-1).

use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        sma_of_series(&closes(bars), self.period)
    }
}

/// Rolling mean of an arbitrary series.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    // Running sum over finite values plus a count of NaNs in the window.
    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }

        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= period && nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}

/// Rolling maximum over a window; NaN inside the window yields NaN.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling_fold(values, period, f64::max)
}

/// Rolling minimum over a window; NaN inside the window yields NaN.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling_fold(values, period, f64::min)
}

fn rolling_fold(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().copied().fold(window[0], pick);
    }
    result
}
