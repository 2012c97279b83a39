//! Squeeze-Momentum: Bollinger-inside-Keltner compression plus a
//! linear-regression momentum histogram.
//!
//! Squeeze states:
//! - on:  lowerBB > lowerKC && upperBB < upperKC
//! - off: lowerBB < lowerKC && upperBB > upperKC
//! - neither when the bands straddle each other
//!
//! Momentum source: close - avg(avg(highest(high), lowest(low)), sma(close)),
//! all over the Keltner length. The momentum value is the least-squares slope
//! of that source over the same window, refit in full at every bar.

use super::bollinger::Bollinger;
use super::keltner::Keltner;
use super::sma::{rolling_max, rolling_min, sma_of_series};
use super::{closes, DEGENERATE_EPSILON};
use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Histogram colour of the momentum bar. Exactly one applies per defined bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumState {
    /// Lime: positive and rising.
    RisingPositive,
    /// Green: positive and falling.
    FallingPositive,
    /// Red: non-positive and falling.
    FallingNegative,
    /// Maroon: non-positive and rising (or flat).
    RisingNegative,
}

impl MomentumState {
    pub fn classify(value: f64, prev: f64) -> Option<MomentumState> {
        if value.is_nan() || prev.is_nan() {
            return None;
        }
        Some(if value > 0.0 {
            if value > prev {
                MomentumState::RisingPositive
            } else {
                MomentumState::FallingPositive
            }
        } else if value < prev {
            MomentumState::FallingNegative
        } else {
            MomentumState::RisingNegative
        })
    }

    pub fn mirrored(self) -> MomentumState {
        match self {
            MomentumState::RisingPositive => MomentumState::FallingNegative,
            MomentumState::FallingPositive => MomentumState::RisingNegative,
            MomentumState::FallingNegative => MomentumState::RisingPositive,
            MomentumState::RisingNegative => MomentumState::FallingPositive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqueezeSeries {
    pub sqz_on: Vec<bool>,
    pub sqz_off: Vec<bool>,
    pub momentum: Vec<f64>,
    pub state: Vec<Option<MomentumState>>,
}

#[derive(Debug, Clone)]
pub struct SqueezeMomentum {
    bollinger: Bollinger,
    keltner: Keltner,
    kc_len: usize,
}

impl SqueezeMomentum {
    pub fn new(bb_len: usize, bb_mult: f64, kc_len: usize, kc_mult: f64) -> Self {
        assert!(kc_len >= 2, "Squeeze momentum length must be >= 2");
        Self {
            bollinger: Bollinger::new(bb_len, bb_mult),
            keltner: Keltner::new(kc_len, kc_mult),
            kc_len,
        }
    }

    /// First index at which the momentum value is defined.
    pub fn lookback(&self) -> usize {
        2 * (self.kc_len - 1)
    }

    pub fn series(&self, bars: &[Bar]) -> SqueezeSeries {
        let n = bars.len();
        let bb = self.bollinger.bands(bars);
        let kc = self.keltner.bands(bars);

        let mut sqz_on = vec![false; n];
        let mut sqz_off = vec![false; n];
        for i in 0..n {
            // NaN comparisons are false, so warm-up bars stay in neither state.
            sqz_on[i] = bb.lower[i] > kc.lower[i] && bb.upper[i] < kc.upper[i];
            sqz_off[i] = bb.lower[i] < kc.lower[i] && bb.upper[i] > kc.upper[i];
        }

        let close = closes(bars);
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let highest = rolling_max(&highs, self.kc_len);
        let lowest = rolling_min(&lows, self.kc_len);
        let basis = sma_of_series(&close, self.kc_len);

        let source: Vec<f64> = (0..n)
            .map(|i| close[i] - ((highest[i] + lowest[i]) / 2.0 + basis[i]) / 2.0)
            .collect();
        let momentum = rolling_slope(&source, self.kc_len);

        let state = (0..n)
            .map(|i| {
                if i == 0 {
                    None
                } else {
                    MomentumState::classify(momentum[i], momentum[i - 1])
                }
            })
            .collect();

        SqueezeSeries {
            sqz_on,
            sqz_off,
            momentum,
            state,
        }
    }
}

impl Default for SqueezeMomentum {
    fn default() -> Self {
        Self::new(20, 2.0, 20, 1.5)
    }
}

/// Least-squares slope of `values` against x = 0..window over each trailing
/// window. Undefined while any value in the window is NaN.
pub fn rolling_slope(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window < 2 || n < window {
        return result;
    }

    let w = window as f64;
    let sum_x = w * (w - 1.0) / 2.0;
    let sum_xx = (w - 1.0) * w * (2.0 * w - 1.0) / 6.0;
    let denom = w * sum_xx - sum_x * sum_x;
    if denom.abs() < DEGENERATE_EPSILON {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let (sum_y, sum_xy) = slice
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sy, sxy), (x, &y)| (sy + y, sxy + x as f64 * y));
        result[i] = (w * sum_xy - sum_x * sum_y) / denom;
    }

    result
}
