//! Look-ahead contamination tests for every indicator and the frame.
//!
//! Invariant:
//! No indicator value at bar t may depend on price data from bar t+1 or later.
//!
//! Method: compute on a truncated series and on the full series. Assert the
//! shared prefix is identical between both runs. Any difference means the
//! indicator is leaking future data into past values.

use chrono::NaiveDate;
use tierlab_core::domain::Bar;
use tierlab_core::indicators::*;

/// Generate N bars of synthetic OHLCV data with realistic variation.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base_date = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 20_000.0;

    for i in 0..n {
        // Deterministic pseudo-random walk using a simple LCG
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.0005; // -5% to +5%
        price = (price * (1.0 + change)).max(100.0);

        let open = price * 0.998;
        let close = price * 1.001;
        let high = open.max(close) * 1.02;
        let low = open.min(close) * 0.98;

        bars.push(Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1_000.0 + i as f64 * 10.0,
        });
    }

    bars
}

fn assert_same_prefix(name: &str, truncated: &[f64], full: &[f64]) {
    for (i, (&t, &f)) in truncated.iter().zip(full).enumerate() {
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{name}: NaN mismatch at bar {i} (truncated={t}, full={f})"
        );
        assert!(
            (t - f).abs() < 1e-9 * f.abs().max(1.0),
            "{name}: look-ahead contamination at bar {i}: truncated={t}, full={f}"
        );
    }
}

fn assert_same_flags<T: PartialEq + std::fmt::Debug>(name: &str, truncated: &[T], full: &[T]) {
    assert_eq!(truncated, &full[..truncated.len()], "{name}: flags differ");
}

/// Assert that the indicator produces identical values for bars 0..truncated_len
/// whether computed on a truncated or full series.
fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated_result = indicator.compute(&full_bars[..truncated_len]);
    let full_result = indicator.compute(full_bars);
    assert_eq!(truncated_result.len(), truncated_len, "{}", indicator.name());
    assert_eq!(full_result.len(), full_bars.len(), "{}", indicator.name());
    assert_same_prefix(indicator.name(), &truncated_result, &full_result);
}

#[test]
fn lookahead_sma() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Sma::new(14), &bars, 100);
    assert_no_lookahead(&Sma::new(50), &bars, 100);
}

#[test]
fn lookahead_ema() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Ema::new(10), &bars, 100);
    assert_no_lookahead(&Ema::new(21), &bars, 100);
}

#[test]
fn lookahead_atr() {
    let bars = make_test_bars(200);
    assert_no_lookahead(&Atr::new(14), &bars, 100);
}

#[test]
fn lookahead_dmi() {
    let bars = make_test_bars(200);
    let dmi = Dmi::new(14);
    assert_no_lookahead(&dmi, &bars, 100);

    let truncated = dmi.series(&bars[..100]);
    let full = dmi.series(&bars);
    assert_same_prefix("plus_di", &truncated.plus_di, &full.plus_di);
    assert_same_prefix("minus_di", &truncated.minus_di, &full.minus_di);
}

#[test]
fn lookahead_bands() {
    let bars = make_test_bars(200);
    for (name, truncated, full) in [
        (
            "bollinger",
            Bollinger::new(20, 2.0).bands(&bars[..100]),
            Bollinger::new(20, 2.0).bands(&bars),
        ),
        (
            "keltner",
            Keltner::new(20, 1.5).bands(&bars[..100]),
            Keltner::new(20, 1.5).bands(&bars),
        ),
    ] {
        assert_same_prefix(name, &truncated.upper, &full.upper);
        assert_same_prefix(name, &truncated.middle, &full.middle);
        assert_same_prefix(name, &truncated.lower, &full.lower);
    }
}

#[test]
fn lookahead_wavetrend() {
    let bars = make_test_bars(200);
    let wt = WaveTrend::default();
    let truncated = wt.series(&bars[..100]);
    let full = wt.series(&bars);
    assert_same_prefix("wt1", &truncated.wt1, &full.wt1);
    assert_same_prefix("wt2", &truncated.wt2, &full.wt2);
    assert_same_flags("golden_cross", &truncated.golden_cross, &full.golden_cross);
    assert_same_flags("death_cross", &truncated.death_cross, &full.death_cross);
}

#[test]
fn lookahead_squeeze() {
    let bars = make_test_bars(200);
    let squeeze = SqueezeMomentum::default();
    let truncated = squeeze.series(&bars[..100]);
    let full = squeeze.series(&bars);
    assert_same_prefix("momentum", &truncated.momentum, &full.momentum);
    assert_same_flags("sqz_on", &truncated.sqz_on, &full.sqz_on);
    assert_same_flags("sqz_off", &truncated.sqz_off, &full.sqz_off);
    assert_same_flags("state", &truncated.state, &full.state);
}

#[test]
fn lookahead_frame() {
    let bars = make_test_bars(320);
    let params = IndicatorParams::default();
    let truncated = IndicatorFrame::compute(&bars[..250], &params);
    let full = IndicatorFrame::compute(&bars, &params);
    assert_eq!(truncated.warmup(), full.warmup());

    let column = |frame: &IndicatorFrame, f: fn(&IndicatorRow) -> f64| -> Vec<f64> {
        frame.rows().iter().map(f).collect()
    };
    let columns: [(&str, fn(&IndicatorRow) -> f64); 10] = [
        ("wt1", |r| r.wt1),
        ("wt2", |r| r.wt2),
        ("momentum", |r| r.momentum),
        ("adx", |r| r.adx),
        ("plus_di", |r| r.plus_di),
        ("minus_di", |r| r.minus_di),
        ("atr", |r| r.atr),
        ("ma_short", |r| r.ma_short),
        ("ma_mid", |r| r.ma_mid),
        ("ma_long", |r| r.ma_long),
    ];
    for (name, f) in columns {
        assert_same_prefix(name, &column(&truncated, f), &column(&full, f));
    }

    // The long average is defined inside the shared prefix.
    assert!(!truncated.rows()[249].ma_long.is_nan());
    for (t, f) in truncated.rows().iter().zip(full.rows()) {
        assert_eq!(t.wt_golden_cross, f.wt_golden_cross);
        assert_eq!(t.sqz_on, f.sqz_on);
        assert_eq!(t.momentum_state, f.momentum_state);
    }
}
