//! Exit rules: bearish signal count and the dedicated trend exit.

use super::condition::{all_hold, Condition, SignalContext};
use crate::indicators::MaLine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRules {
    /// Counted each bar; the count gates partial and full exits.
    pub signals: Vec<Condition>,
    /// Minimum count before a partial take-profit may fire.
    pub partial_min_signals: usize,
    /// Count at which the whole ladder exits. `None` leaves only `trend_exit`.
    pub full_exit_signals: Option<usize>,
    /// Conjunction that closes every tier when it holds. Empty never fires.
    pub trend_exit: Vec<Condition>,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            signals: vec![
                Condition::WtDeathCross,
                Condition::AdxBelow { level: 20.0 },
                Condition::CloseBelowMa { ma: MaLine::Short },
                Condition::SqueezeOn,
            ],
            partial_min_signals: 2,
            full_exit_signals: Some(3),
            // Needs a fresh death cross: below-MA and -DI leadership are
            // still true on the bar tier 1 buys.
            trend_exit: vec![
                Condition::WtDeathCross,
                Condition::CloseBelowMa { ma: MaLine::Mid },
                Condition::MinusDiLeads,
            ],
        }
    }
}

impl ExitRules {
    pub fn count(&self, ctx: &SignalContext<'_>) -> usize {
        self.signals.iter().filter(|c| c.eval(ctx)).count()
    }

    pub fn trend_exit_fires(&self, ctx: &SignalContext<'_>, count: usize) -> bool {
        let by_count = self.full_exit_signals.is_some_and(|n| count >= n);
        by_count || all_hold(&self.trend_exit, ctx)
    }

    /// Bearish exits for a short ladder become bullish ones.
    pub fn mirrored(&self) -> ExitRules {
        ExitRules {
            signals: self.signals.iter().map(Condition::mirrored).collect(),
            partial_min_signals: self.partial_min_signals,
            full_exit_signals: self.full_exit_signals,
            trend_exit: self.trend_exit.iter().map(Condition::mirrored).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::indicators::IndicatorRow;
    use chrono::NaiveDate;

    fn row(death_cross: bool, adx: f64, ma_short: f64) -> IndicatorRow {
        IndicatorRow {
            wt1: 40.0,
            wt2: 45.0,
            wt_golden_cross: false,
            wt_death_cross: death_cross,
            sqz_on: false,
            sqz_off: false,
            momentum: 1.0,
            momentum_state: None,
            adx,
            plus_di: 25.0,
            minus_di: 15.0,
            atr: 2.0,
            ma_short,
            ma_mid: 90.0,
            ma_long: 80.0,
        }
    }

    fn bar() -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1.0,
        }
    }

    #[test]
    fn count_tallies_true_signals() {
        let rules = ExitRules::default();
        let b = bar();
        let r = row(true, 15.0, 105.0);
        let ctx = SignalContext {
            bar: &b,
            row: &r,
            prev: None,
        };
        // death cross, adx < 20, close < ma_short
        assert_eq!(rules.count(&ctx), 3);
        assert!(rules.trend_exit_fires(&ctx, 3));
    }

    #[test]
    fn below_full_count_without_trend_break() {
        let rules = ExitRules::default();
        let b = bar();
        let r = row(true, 30.0, 95.0);
        let ctx = SignalContext {
            bar: &b,
            row: &r,
            prev: None,
        };
        assert_eq!(rules.count(&ctx), 1);
        assert!(!rules.trend_exit_fires(&ctx, 1));
    }

    #[test]
    fn trend_break_waits_for_a_death_cross() {
        let rules = ExitRules::default();
        let b = bar();
        // Oversold bounce: below the mid average, -DI leading, momentum down.
        let mut r = row(false, 45.0, 95.0);
        r.ma_mid = 110.0;
        r.plus_di = 5.0;
        r.minus_di = 40.0;
        r.momentum = -0.5;
        let ctx = SignalContext {
            bar: &b,
            row: &r,
            prev: None,
        };
        let count = rules.count(&ctx);
        assert!(!rules.trend_exit_fires(&ctx, count));

        r.wt_death_cross = true;
        let ctx = SignalContext {
            bar: &b,
            row: &r,
            prev: None,
        };
        let count = rules.count(&ctx);
        assert!(rules.trend_exit_fires(&ctx, count));
    }

    #[test]
    fn count_only_mode_disabled() {
        let rules = ExitRules {
            full_exit_signals: None,
            trend_exit: Vec::new(),
            ..ExitRules::default()
        };
        let b = bar();
        let r = row(true, 15.0, 105.0);
        let ctx = SignalContext {
            bar: &b,
            row: &r,
            prev: None,
        };
        assert!(!rules.trend_exit_fires(&ctx, 4));
    }

    #[test]
    fn mirrored_exit_rules() {
        let short = ExitRules::default().mirrored();
        assert_eq!(short.signals[0], Condition::WtGoldenCross);
        assert_eq!(short.partial_min_signals, 2);
    }
}
