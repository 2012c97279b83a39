//! ADX/DMI: Average Directional Index with directional indicators (Wilder).
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive bars
//! 2. Smooth +DM, -DM, and TR using Wilder smoothing (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR)
//! 4. -DI = 100 * smoothed(-DM) / smoothed(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = Wilder-smoothed DX
//!
//! A zero smoothed TR or a zero DI sum yields 0 rather than NaN.
//! Lookback: 2 * period - 1 (period for DI smoothing, then period - 1 more for ADX).

use super::atr::{true_range, wilder_smooth};
use super::{Indicator, DEGENERATE_EPSILON};
use crate::domain::Bar;

/// +DI, -DI and ADX aligned with the input bars.
#[derive(Debug, Clone, PartialEq)]
pub struct DmiSeries {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Dmi {
    period: usize,
    name: String,
}

impl Dmi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }

    pub fn series(&self, bars: &[Bar]) -> DmiSeries {
        let n = bars.len();
        let mut plus_di = vec![f64::NAN; n];
        let mut minus_di = vec![f64::NAN; n];

        if n < 2 {
            return DmiSeries {
                plus_di,
                minus_di,
                adx: vec![f64::NAN; n],
            };
        }

        // Step 1: +DM and -DM
        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let up_move = bars[i].high - bars[i - 1].high;
            let down_move = bars[i - 1].low - bars[i].low;
            if up_move.is_nan() || down_move.is_nan() {
                continue;
            }
            plus_dm[i] = if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            };
            minus_dm[i] = if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            };
        }

        // Step 2: Wilder smooth +DM, -DM, and TR (TR[0] has no previous close)
        let mut tr = true_range(bars);
        tr[0] = f64::NAN;
        let smooth_tr = wilder_smooth(&tr, self.period);
        let smooth_plus_dm = wilder_smooth(&plus_dm, self.period);
        let smooth_minus_dm = wilder_smooth(&minus_dm, self.period);

        // Step 3-5: DI pair, then DX
        let mut dx = vec![f64::NAN; n];
        for i in 0..n {
            if smooth_tr[i].is_nan() || smooth_plus_dm[i].is_nan() || smooth_minus_dm[i].is_nan() {
                continue;
            }
            if smooth_tr[i].abs() < DEGENERATE_EPSILON {
                plus_di[i] = 0.0;
                minus_di[i] = 0.0;
                dx[i] = 0.0;
                continue;
            }

            let pdi = 100.0 * smooth_plus_dm[i] / smooth_tr[i];
            let mdi = 100.0 * smooth_minus_dm[i] / smooth_tr[i];
            plus_di[i] = pdi;
            minus_di[i] = mdi;

            let di_sum = pdi + mdi;
            dx[i] = if di_sum.abs() < DEGENERATE_EPSILON {
                0.0
            } else {
                100.0 * (pdi - mdi).abs() / di_sum
            };
        }

        // Step 6: Wilder smooth DX to get ADX
        let adx = wilder_smooth(&dx, self.period);

        DmiSeries {
            plus_di,
            minus_di,
            adx,
        }
    }
}

impl Indicator for Dmi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.series(bars).adx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, make_ohlc_bars};

    fn trending_up(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + 2.0 * i as f64).collect();
        make_bars(&closes)
    }

    #[test]
    fn adx_bounds() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.3).sin() + i as f64 * 0.2)
            .collect();
        let series = Dmi::new(14).series(&make_bars(&closes));
        for (i, v) in series.adx.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(v), "ADX out of range at {i}: {v}");
            }
        }
        assert!(!series.adx[79].is_nan());
    }

    #[test]
    fn uptrend_plus_di_leads() {
        let series = Dmi::new(14).series(&trending_up(60));
        assert!(series.plus_di[59] > series.minus_di[59]);
        assert!(series.adx[59] > 50.0, "steady trend should have strong ADX");
    }

    #[test]
    fn downtrend_minus_di_leads() {
        let closes: Vec<f64> = (0..60).map(|i| 300.0 - 2.0 * i as f64).collect();
        let series = Dmi::new(14).series(&make_bars(&closes));
        assert!(series.minus_di[59] > series.plus_di[59]);
    }

    #[test]
    fn flat_zero_range_is_zero_not_nan() {
        let bars = make_ohlc_bars(&[(100.0, 100.0, 100.0, 100.0); 40]);
        let series = Dmi::new(14).series(&bars);
        assert_eq!(series.plus_di[39], 0.0);
        assert_eq!(series.minus_di[39], 0.0);
        assert_eq!(series.adx[39], 0.0);
    }

    #[test]
    fn warmup_matches_lookback() {
        let dmi = Dmi::new(5);
        let adx = dmi.compute(&trending_up(30));
        assert!(adx[dmi.lookback() - 1].is_nan());
        assert!(!adx[dmi.lookback()].is_nan());
    }

    #[test]
    fn too_few_bars_all_nan() {
        let series = Dmi::new(14).series(&trending_up(1));
        assert!(series.adx[0].is_nan());
        assert!(series.plus_di[0].is_nan());
    }
}
