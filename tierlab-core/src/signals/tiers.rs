//! Tier table: one rule per ladder rung.

use super::condition::{all_hold, Condition, SignalContext};
use crate::domain::EntryTier;
use crate::indicators::{MaLine, MomentumState};
use serde::{Deserialize, Serialize};

/// Entry rule for one tier: a conjunction of conditions plus sizing and stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    pub tier: EntryTier,
    pub conditions: Vec<Condition>,
    /// Fraction of current total value committed at entry, in (0, 1].
    pub size_fraction: f64,
    /// Fixed stop distance as a fraction of entry price; 0 disables it.
    pub stop_pct: f64,
}

impl TierRule {
    pub fn holds(&self, ctx: &SignalContext<'_>) -> bool {
        all_hold(&self.conditions, ctx)
    }

    pub fn mirrored(&self) -> TierRule {
        TierRule {
            tier: self.tier,
            conditions: self.conditions.iter().map(Condition::mirrored).collect(),
            size_fraction: self.size_fraction,
            stop_pct: self.stop_pct,
        }
    }
}

/// Four-rung long ladder: oversold reversal, momentum confirmation,
/// trend confirmation, then squeeze expansion above the long average.
///
/// Tier 1 waits for -DI to roll over as well as WT1 to sit above its signal
/// line; on a steady slide WT1 can curl above WT2 well before the low.
pub fn default_long_tiers() -> Vec<TierRule> {
    vec![
        TierRule {
            tier: EntryTier::One,
            conditions: vec![
                Condition::Wt1Below { level: -53.0 },
                Condition::Wt1AboveWt2,
                Condition::MinusDiFalling,
            ],
            size_fraction: 0.25,
            stop_pct: 0.08,
        },
        TierRule {
            tier: EntryTier::Two,
            conditions: vec![
                Condition::MomentumPositive,
                Condition::CloseAboveMa { ma: MaLine::Short },
                Condition::AdxRising,
            ],
            size_fraction: 0.25,
            stop_pct: 0.07,
        },
        TierRule {
            tier: EntryTier::Three,
            conditions: vec![
                Condition::CloseAboveMa { ma: MaLine::Mid },
                Condition::PlusDiLeads,
                Condition::AdxAbove { level: 20.0 },
            ],
            size_fraction: 0.25,
            stop_pct: 0.06,
        },
        TierRule {
            tier: EntryTier::Four,
            conditions: vec![
                Condition::AnyOf {
                    conditions: vec![
                        Condition::SqueezeFired,
                        Condition::Momentum {
                            state: MomentumState::RisingPositive,
                        },
                    ],
                },
                Condition::CloseAboveMa { ma: MaLine::Long },
                Condition::AdxAbove { level: 25.0 },
            ],
            size_fraction: 0.25,
            stop_pct: 0.05,
        },
    ]
}
