//! Indicator library: pure transforms from a bar series to aligned series.
//!
//! Every output has the same length as its input, with `f64::NAN` over the
//! warm-up window. Single-series indicators (SMA, EMA, ATR, ADX) implement the
//! `Indicator` trait; multi-output indicators (WaveTrend, Squeeze-Momentum,
//! DMI, band pairs) expose typed series structs. `IndicatorFrame` composes the
//! whole pipeline once per run.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod frame;
pub mod keltner;
pub mod sma;
pub mod squeeze;
pub mod wavetrend;

pub use adx::{Dmi, DmiSeries};
pub use atr::Atr;
pub use bollinger::Bollinger;
pub use ema::Ema;
pub use frame::{IndicatorFrame, IndicatorParams, IndicatorRow, MaLine};
pub use keltner::Keltner;
pub use sma::Sma;
pub use squeeze::{MomentumState, SqueezeMomentum, SqueezeSeries};
pub use wavetrend::{WaveTrend, WaveTrendSeries};

use crate::domain::Bar;

/// Denominators with magnitude below this are treated as zero.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// Trait for single-series indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values should be `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Upper/middle/lower band triple shared by Bollinger and Keltner.
#[derive(Debug, Clone, PartialEq)]
pub struct Bands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Create bars from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
