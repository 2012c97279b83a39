//! Condition: one boolean test over an indicator row.
//!
//! Conditions are configuration data, not code: tier predicates and exit rules
//! are lists of them. Any comparison touching an undefined (NaN) value is false.

use crate::domain::Bar;
use crate::indicators::{IndicatorRow, MaLine, MomentumState};
use serde::{Deserialize, Serialize};

/// Everything a condition may look at for one bar.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub bar: &'a Bar,
    pub row: &'a IndicatorRow,
    /// Previous bar's row, `None` on the first bar.
    pub prev: Option<&'a IndicatorRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    Always,
    Wt1Below {
        level: f64,
    },
    Wt1Above {
        level: f64,
    },
    WtGoldenCross,
    WtDeathCross,
    /// WT1 above its signal line: the state a golden cross leaves behind.
    Wt1AboveWt2,
    Wt1BelowWt2,
    SqueezeOn,
    SqueezeOff,
    /// Squeeze released on this bar: off now, on at the previous bar.
    SqueezeFired,
    Momentum {
        state: MomentumState,
    },
    MomentumPositive,
    MomentumNegative,
    CloseAboveMa {
        ma: MaLine,
    },
    CloseBelowMa {
        ma: MaLine,
    },
    MaAbove {
        fast: MaLine,
        slow: MaLine,
    },
    AdxAbove {
        level: f64,
    },
    AdxBelow {
        level: f64,
    },
    AdxRising,
    PlusDiLeads,
    MinusDiLeads,
    PlusDiFalling,
    /// Selling pressure easing off: -DI below its previous value.
    MinusDiFalling,
    AnyOf {
        conditions: Vec<Condition>,
    },
}

impl Condition {
    pub fn eval(&self, ctx: &SignalContext<'_>) -> bool {
        let row = ctx.row;
        match self {
            Condition::Always => true,
            Condition::Wt1Below { level } => row.wt1 < *level,
            Condition::Wt1Above { level } => row.wt1 > *level,
            Condition::WtGoldenCross => row.wt_golden_cross,
            Condition::WtDeathCross => row.wt_death_cross,
            Condition::Wt1AboveWt2 => row.wt1 > row.wt2,
            Condition::Wt1BelowWt2 => row.wt1 < row.wt2,
            Condition::SqueezeOn => row.sqz_on,
            Condition::SqueezeOff => row.sqz_off,
            Condition::SqueezeFired => row.sqz_off && ctx.prev.is_some_and(|p| p.sqz_on),
            Condition::Momentum { state } => row.momentum_state == Some(*state),
            Condition::MomentumPositive => row.momentum > 0.0,
            Condition::MomentumNegative => row.momentum < 0.0,
            Condition::CloseAboveMa { ma } => ctx.bar.close > row.ma(*ma),
            Condition::CloseBelowMa { ma } => ctx.bar.close < row.ma(*ma),
            Condition::MaAbove { fast, slow } => row.ma(*fast) > row.ma(*slow),
            Condition::AdxAbove { level } => row.adx > *level,
            Condition::AdxBelow { level } => row.adx < *level,
            Condition::AdxRising => ctx.prev.is_some_and(|p| row.adx > p.adx),
            Condition::PlusDiLeads => row.plus_di > row.minus_di,
            Condition::MinusDiLeads => row.minus_di > row.plus_di,
            Condition::PlusDiFalling => ctx.prev.is_some_and(|p| row.plus_di < p.plus_di),
            Condition::MinusDiFalling => ctx.prev.is_some_and(|p| row.minus_di < p.minus_di),
            Condition::AnyOf { conditions } => conditions.iter().any(|c| c.eval(ctx)),
        }
    }

    /// The bearish twin of a bullish condition (and vice versa).
    ///
    /// Direction-neutral conditions (squeeze state, trend strength) map to
    /// themselves; oscillator levels flip sign around zero.
    pub fn mirrored(&self) -> Condition {
        match self {
            Condition::Always => Condition::Always,
            Condition::Wt1Below { level } => Condition::Wt1Above { level: -level },
            Condition::Wt1Above { level } => Condition::Wt1Below { level: -level },
            Condition::WtGoldenCross => Condition::WtDeathCross,
            Condition::WtDeathCross => Condition::WtGoldenCross,
            Condition::Wt1AboveWt2 => Condition::Wt1BelowWt2,
            Condition::Wt1BelowWt2 => Condition::Wt1AboveWt2,
            Condition::SqueezeOn => Condition::SqueezeOn,
            Condition::SqueezeOff => Condition::SqueezeOff,
            Condition::SqueezeFired => Condition::SqueezeFired,
            Condition::Momentum { state } => Condition::Momentum {
                state: state.mirrored(),
            },
            Condition::MomentumPositive => Condition::MomentumNegative,
            Condition::MomentumNegative => Condition::MomentumPositive,
            Condition::CloseAboveMa { ma } => Condition::CloseBelowMa { ma: *ma },
            Condition::CloseBelowMa { ma } => Condition::CloseAboveMa { ma: *ma },
            Condition::MaAbove { fast, slow } => Condition::MaAbove {
                fast: *slow,
                slow: *fast,
            },
            Condition::AdxAbove { level } => Condition::AdxAbove { level: *level },
            Condition::AdxBelow { level } => Condition::AdxBelow { level: *level },
            Condition::AdxRising => Condition::AdxRising,
            Condition::PlusDiLeads => Condition::MinusDiLeads,
            Condition::MinusDiLeads => Condition::PlusDiLeads,
            Condition::PlusDiFalling => Condition::MinusDiFalling,
            Condition::MinusDiFalling => Condition::PlusDiFalling,
            Condition::AnyOf { conditions } => Condition::AnyOf {
                conditions: conditions.iter().map(Condition::mirrored).collect(),
            },
        }
    }
}

/// Conjunction of a condition list. An empty list never holds.
pub fn all_hold(conditions: &[Condition], ctx: &SignalContext<'_>) -> bool {
    !conditions.is_empty() && conditions.iter().all(|c| c.eval(ctx))
}
