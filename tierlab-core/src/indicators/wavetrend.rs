//! WaveTrend oscillator (LazyBear formulation).
//!
//! ap  = (high + low + close) / 3
//! esa = EMA(ap, channel)
//! d   = EMA(|ap - esa|, channel)
//! ci  = (ap - esa) / (0.015 * d)      ci = 0 when d ≈ 0
//! wt1 = EMA(ci, average)
//! wt2 = SMA(wt1, signal)
//!
//! Crosses are sign changes of wt1 - wt2 between consecutive defined bars:
//! golden when prev <= 0 < cur, death when prev >= 0 > cur.

use super::ema::ema_of_series;
use super::sma::sma_of_series;
use super::DEGENERATE_EPSILON;
use crate::domain::Bar;

/// Scaling constant of the channel index.
const CI_SCALE: f64 = 0.015;

#[derive(Debug, Clone, PartialEq)]
pub struct WaveTrendSeries {
    pub wt1: Vec<f64>,
    pub wt2: Vec<f64>,
    pub golden_cross: Vec<bool>,
    pub death_cross: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct WaveTrend {
    channel_len: usize,
    average_len: usize,
    signal_len: usize,
}

impl WaveTrend {
    pub fn new(channel_len: usize, average_len: usize, signal_len: usize) -> Self {
        assert!(
            channel_len >= 1 && average_len >= 1 && signal_len >= 1,
            "WaveTrend lengths must be >= 1"
        );
        Self {
            channel_len,
            average_len,
            signal_len,
        }
    }

    /// First index at which wt2 is defined.
    pub fn lookback(&self) -> usize {
        2 * (self.channel_len - 1) + (self.average_len - 1) + (self.signal_len - 1)
    }

    pub fn series(&self, bars: &[Bar]) -> WaveTrendSeries {
        let n = bars.len();
        let ap: Vec<f64> = bars.iter().map(Bar::typical_price).collect();
        let esa = ema_of_series(&ap, self.channel_len);

        let deviation: Vec<f64> = ap.iter().zip(&esa).map(|(a, e)| (a - e).abs()).collect();
        let d = ema_of_series(&deviation, self.channel_len);

        let ci: Vec<f64> = (0..n)
            .map(|i| {
                if d[i].is_nan() {
                    f64::NAN
                } else if d[i].abs() < DEGENERATE_EPSILON {
                    0.0
                } else {
                    (ap[i] - esa[i]) / (CI_SCALE * d[i])
                }
            })
            .collect();

        let wt1 = ema_of_series(&ci, self.average_len);
        let wt2 = sma_of_series(&wt1, self.signal_len);

        let mut golden_cross = vec![false; n];
        let mut death_cross = vec![false; n];
        for i in 1..n {
            let prev = wt1[i - 1] - wt2[i - 1];
            let cur = wt1[i] - wt2[i];
            if prev.is_nan() || cur.is_nan() {
                continue;
            }
            golden_cross[i] = prev <= 0.0 && cur > 0.0;
            death_cross[i] = prev >= 0.0 && cur < 0.0;
        }

        WaveTrendSeries {
            wt1,
            wt2,
            golden_cross,
            death_cross,
        }
    }
}

impl Default for WaveTrend {
    fn default() -> Self {
        Self::new(10, 21, 4)
    }
}
