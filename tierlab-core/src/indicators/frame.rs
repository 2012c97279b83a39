//! IndicatorFrame: every derived series the signal layer reads, computed once.
//!
//! Built before the bar loop and queried by index. Rows in the warm-up region
//! carry NaN (and `false` / `None` for derived flags), which every condition
//! reads as "not met".

use super::adx::Dmi;
use super::atr::Atr;
use super::sma::Sma;
use super::squeeze::{MomentumState, SqueezeMomentum};
use super::wavetrend::WaveTrend;
use super::Indicator;
use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Parameters of the indicator pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub wt_channel_len: usize,
    pub wt_average_len: usize,
    pub wt_signal_len: usize,
    pub bb_len: usize,
    pub bb_mult: f64,
    pub kc_len: usize,
    pub kc_mult: f64,
    pub adx_len: usize,
    pub atr_len: usize,
    pub ma_short: usize,
    pub ma_mid: usize,
    pub ma_long: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            wt_channel_len: 10,
            wt_average_len: 21,
            wt_signal_len: 4,
            bb_len: 20,
            bb_mult: 2.0,
            kc_len: 20,
            kc_mult: 1.5,
            adx_len: 14,
            atr_len: 14,
            ma_short: 14,
            ma_mid: 50,
            ma_long: 200,
        }
    }
}

impl IndicatorParams {
    /// Problems with the parameter set, empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let lengths = [
            ("wt_channel_len", self.wt_channel_len, 1),
            ("wt_average_len", self.wt_average_len, 1),
            ("wt_signal_len", self.wt_signal_len, 1),
            ("bb_len", self.bb_len, 1),
            ("kc_len", self.kc_len, 2),
            ("adx_len", self.adx_len, 1),
            ("atr_len", self.atr_len, 1),
            ("ma_short", self.ma_short, 1),
            ("ma_mid", self.ma_mid, 1),
            ("ma_long", self.ma_long, 1),
        ];
        for (name, value, min) in lengths {
            if value < min {
                problems.push(format!("{name} must be >= {min}, got {value}"));
            }
        }
        for (name, value) in [("bb_mult", self.bb_mult), ("kc_mult", self.kc_mult)] {
            if !(value.is_finite() && value > 0.0) {
                problems.push(format!("{name} must be positive, got {value}"));
            }
        }
        problems
    }
}

/// Which of the three simple moving averages of close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaLine {
    /// 14 bars by default.
    Short,
    /// 50 bars by default.
    Mid,
    /// 200 bars by default.
    Long,
}

/// Indicator values at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRow {
    pub wt1: f64,
    pub wt2: f64,
    pub wt_golden_cross: bool,
    pub wt_death_cross: bool,
    pub sqz_on: bool,
    pub sqz_off: bool,
    pub momentum: f64,
    pub momentum_state: Option<MomentumState>,
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub atr: f64,
    pub ma_short: f64,
    pub ma_mid: f64,
    pub ma_long: f64,
}

impl IndicatorRow {
    pub fn ma(&self, line: MaLine) -> f64 {
        match line {
            MaLine::Short => self.ma_short,
            MaLine::Mid => self.ma_mid,
            MaLine::Long => self.ma_long,
        }
    }

    pub fn is_lime(&self) -> bool {
        self.momentum_state == Some(MomentumState::RisingPositive)
    }

    pub fn is_green(&self) -> bool {
        self.momentum_state == Some(MomentumState::FallingPositive)
    }

    pub fn is_red(&self) -> bool {
        self.momentum_state == Some(MomentumState::FallingNegative)
    }

    pub fn is_maroon(&self) -> bool {
        self.momentum_state == Some(MomentumState::RisingNegative)
    }
}

/// Precomputed per-bar indicator rows aligned with the bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorFrame {
    rows: Vec<IndicatorRow>,
    warmup: usize,
}

impl IndicatorFrame {
    /// Run the full pipeline over `bars`. Parameters must already be valid.
    pub fn compute(bars: &[Bar], params: &IndicatorParams) -> Self {
        let wavetrend = WaveTrend::new(
            params.wt_channel_len,
            params.wt_average_len,
            params.wt_signal_len,
        );
        let squeeze = SqueezeMomentum::new(params.bb_len, params.bb_mult, params.kc_len, params.kc_mult);
        let dmi = Dmi::new(params.adx_len);
        let atr = Atr::new(params.atr_len);
        let ma_short = Sma::new(params.ma_short);
        let ma_mid = Sma::new(params.ma_mid);
        let ma_long = Sma::new(params.ma_long);

        let wt = wavetrend.series(bars);
        let sqz = squeeze.series(bars);
        let di = dmi.series(bars);
        let atr_values = atr.compute(bars);
        let short = ma_short.compute(bars);
        let mid = ma_mid.compute(bars);
        let long = ma_long.compute(bars);

        let rows = (0..bars.len())
            .map(|i| IndicatorRow {
                wt1: wt.wt1[i],
                wt2: wt.wt2[i],
                wt_golden_cross: wt.golden_cross[i],
                wt_death_cross: wt.death_cross[i],
                sqz_on: sqz.sqz_on[i],
                sqz_off: sqz.sqz_off[i],
                momentum: sqz.momentum[i],
                momentum_state: sqz.state[i],
                adx: di.adx[i],
                plus_di: di.plus_di[i],
                minus_di: di.minus_di[i],
                atr: atr_values[i],
                ma_short: short[i],
                ma_mid: mid[i],
                ma_long: long[i],
            })
            .collect();

        let warmup = [
            wavetrend.lookback(),
            squeeze.lookback() + 1,
            dmi.lookback(),
            atr.lookback(),
            ma_short.lookback(),
            ma_mid.lookback(),
            ma_long.lookback(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        Self { rows, warmup }
    }

    /// First bar index at which every indicator is defined.
    pub fn warmup(&self) -> usize {
        self.warmup
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&IndicatorRow> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[IndicatorRow] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn sine_bars(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n)
            .map(|i| 30_000.0 + 2_000.0 * (i as f64 * 0.15).sin() + 5.0 * i as f64)
            .collect();
        make_bars(&closes)
    }

    #[test]
    fn frame_aligned_with_bars() {
        let bars = sine_bars(260);
        let frame = IndicatorFrame::compute(&bars, &IndicatorParams::default());
        assert_eq!(frame.len(), bars.len());
        assert!(frame.row(260).is_none());
    }

    #[test]
    fn default_warmup_is_long_ma() {
        let bars = sine_bars(260);
        let frame = IndicatorFrame::compute(&bars, &IndicatorParams::default());
        assert_eq!(frame.warmup(), 199);
        let row = frame.row(frame.warmup()).unwrap();
        for v in [
            row.wt1, row.wt2, row.momentum, row.adx, row.plus_di, row.minus_di, row.atr,
            row.ma_short, row.ma_mid, row.ma_long,
        ] {
            assert!(!v.is_nan());
        }
        assert!(row.momentum_state.is_some());
        assert!(frame.row(198).unwrap().ma_long.is_nan());
    }

    #[test]
    fn ma_selector() {
        let bars = sine_bars(220);
        let frame = IndicatorFrame::compute(&bars, &IndicatorParams::default());
        let row = frame.row(210).unwrap();
        assert_eq!(row.ma(MaLine::Short), row.ma_short);
        assert_eq!(row.ma(MaLine::Mid), row.ma_mid);
        assert_eq!(row.ma(MaLine::Long), row.ma_long);
    }

    #[test]
    fn colour_flags_match_state() {
        let bars = sine_bars(120);
        let frame = IndicatorFrame::compute(&bars, &IndicatorParams::default());
        for row in frame.rows() {
            let flags = [row.is_lime(), row.is_green(), row.is_red(), row.is_maroon()];
            let set = flags.iter().filter(|f| **f).count();
            assert_eq!(set, usize::from(row.momentum_state.is_some()));
        }
    }

    #[test]
    fn default_params_are_valid() {
        assert!(IndicatorParams::default().problems().is_empty());
        let bad = IndicatorParams {
            kc_len: 1,
            bb_mult: 0.0,
            ..IndicatorParams::default()
        };
        assert_eq!(bad.problems().len(), 2);
    }

    #[test]
    fn params_from_partial_toml() {
        let params: IndicatorParams = toml::from_str("ma_long = 100\natr_len = 10\n").unwrap();
        assert_eq!(params.ma_long, 100);
        assert_eq!(params.atr_len, 10);
        assert_eq!(params.wt_channel_len, 10);
    }
}
