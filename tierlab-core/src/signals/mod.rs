//! Signal evaluator: maps one indicator row to entry and exit decisions.
//!
//! Pure: the same bar, rows and rule tables always give the same `SignalSet`.
//! Entries are raw predicate results; the loop applies cycle gating itself
//! because a tier opened earlier in the bar unlocks the next one.

pub mod condition;
pub mod exit;
pub mod tiers;

pub use condition::{all_hold, Condition, SignalContext};
pub use exit::ExitRules;
pub use tiers::{default_long_tiers, TierRule};

use crate::domain::EntryTier;

/// Evaluator output for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalSet {
    /// Raw predicate result per tier, indexed by `level - 1`.
    pub entries: [bool; 4],
    pub exit_count: usize,
    pub trend_exit: bool,
}

impl SignalSet {
    pub fn entry(&self, tier: EntryTier) -> bool {
        self.entries[usize::from(tier.level() - 1)]
    }
}

/// Evaluate the tier table and exit rules at one bar.
pub fn evaluate(tiers: &[TierRule], exits: &ExitRules, ctx: &SignalContext<'_>) -> SignalSet {
    let mut entries = [false; 4];
    for rule in tiers {
        entries[usize::from(rule.tier.level() - 1)] = rule.holds(ctx);
    }
    let exit_count = exits.count(ctx);
    SignalSet {
        entries,
        exit_count,
        trend_exit: exits.trend_exit_fires(ctx, exit_count),
    }
}
