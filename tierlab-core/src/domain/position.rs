//! Position tiers: one independently sized slice of the progressive ladder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Remaining size below this is treated as flat.
pub const SIZE_EPSILON: f64 = 1e-9;

/// Trade direction of a strategy. All tiers of one run share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// Ladder rung. Tier N may only open once tier N-1 was entered in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EntryTier {
    One,
    Two,
    Three,
    Four,
}

impl EntryTier {
    pub const ALL: [EntryTier; 4] = [
        EntryTier::One,
        EntryTier::Two,
        EntryTier::Three,
        EntryTier::Four,
    ];

    pub fn level(self) -> u8 {
        match self {
            EntryTier::One => 1,
            EntryTier::Two => 2,
            EntryTier::Three => 3,
            EntryTier::Four => 4,
        }
    }

    pub fn from_level(level: u8) -> Option<EntryTier> {
        match level {
            1 => Some(EntryTier::One),
            2 => Some(EntryTier::Two),
            3 => Some(EntryTier::Three),
            4 => Some(EntryTier::Four),
            _ => None,
        }
    }

    /// The tier that gates this one, `None` for tier 1.
    pub fn previous(self) -> Option<EntryTier> {
        match self {
            EntryTier::One => None,
            EntryTier::Two => Some(EntryTier::One),
            EntryTier::Three => Some(EntryTier::Two),
            EntryTier::Four => Some(EntryTier::Three),
        }
    }

    fn bit(self) -> u8 {
        1 << (self.level() - 1)
    }
}

impl From<EntryTier> for u8 {
    fn from(tier: EntryTier) -> u8 {
        tier.level()
    }
}

impl TryFrom<u8> for EntryTier {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        EntryTier::from_level(level).ok_or_else(|| format!("tier level {level} outside 1..=4"))
    }
}

impl std::fmt::Display for EntryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.level())
    }
}

/// Set of tiers opened during the current position cycle.
///
/// Survives partial and full exits of individual tiers; cleared only when the
/// whole ladder is flat. A tier in this set cannot re-open until the reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleState {
    tiers_ever_entered: u8,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_entered(&mut self, tier: EntryTier) {
        self.tiers_ever_entered |= tier.bit();
    }

    pub fn has_entered(&self, tier: EntryTier) -> bool {
        self.tiers_ever_entered & tier.bit() != 0
    }

    /// Tier is eligible when it has not run this cycle and its gate tier has.
    pub fn is_unlocked(&self, tier: EntryTier) -> bool {
        if self.has_entered(tier) {
            return false;
        }
        match tier.previous() {
            None => true,
            Some(prev) => self.has_entered(prev),
        }
    }

    pub fn entered(&self) -> impl Iterator<Item = EntryTier> + '_ {
        EntryTier::ALL.into_iter().filter(|t| self.has_entered(*t))
    }

    pub fn is_empty(&self) -> bool {
        self.tiers_ever_entered == 0
    }

    pub fn reset(&mut self) {
        self.tiers_ever_entered = 0;
    }
}

/// One open tier of the ladder.
///
/// Sizes are unsigned unit counts; `direction` carries the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTier {
    pub level: EntryTier,
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub size: f64,
    pub remaining_size: f64,
    /// Fixed stop, `None` when the tier was opened without one.
    pub stop_price: Option<f64>,
    /// Ratcheting ATR trail, `None` until ATR is defined.
    pub trail_stop_price: Option<f64>,
    pub partial_exit_done: bool,
}

impl PositionTier {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        level: EntryTier,
        direction: Direction,
        entry_bar: usize,
        entry_date: NaiveDate,
        entry_price: f64,
        size: f64,
        stop_pct: f64,
        initial_trail: Option<f64>,
    ) -> Self {
        let stop_price = if stop_pct > 0.0 {
            Some(entry_price * (1.0 - direction.sign() * stop_pct))
        } else {
            None
        };
        Self {
            level,
            direction,
            entry_bar,
            entry_date,
            entry_price,
            size,
            remaining_size: size,
            stop_price,
            trail_stop_price: initial_trail,
            partial_exit_done: false,
        }
    }

    /// Signed unit count: positive for long, negative for short.
    pub fn signed_units(&self) -> f64 {
        self.direction.sign() * self.remaining_size
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.signed_units() * price
    }

    /// Unsigned notional of the remaining size.
    pub fn exposure(&self, price: f64) -> f64 {
        self.remaining_size * price
    }

    /// Unrealized return as a fraction of entry price, positive when in profit.
    pub fn unrealized_return(&self, price: f64) -> f64 {
        self.direction.sign() * (price / self.entry_price - 1.0)
    }

    pub fn is_closed(&self) -> bool {
        self.remaining_size < SIZE_EPSILON
    }

    /// True when the bar's adverse extreme reaches the fixed stop.
    pub fn stop_breached(&self, low: f64, high: f64) -> bool {
        match (self.stop_price, self.direction) {
            (Some(stop), Direction::Long) => low <= stop,
            (Some(stop), Direction::Short) => high >= stop,
            (None, _) => false,
        }
    }

    /// Ratchet the trail toward price: it only ever tightens.
    pub fn ratchet_trail(&mut self, close: f64, atr: f64, multiplier: f64) {
        if atr.is_nan() {
            return;
        }
        let candidate = close - self.direction.sign() * multiplier * atr;
        self.trail_stop_price = Some(match (self.trail_stop_price, self.direction) {
            (None, _) => candidate,
            (Some(prev), Direction::Long) => prev.max(candidate),
            (Some(prev), Direction::Short) => prev.min(candidate),
        });
    }

    /// True when the close sits on the wrong side of the trail.
    pub fn trail_crossed(&self, close: f64) -> bool {
        match (self.trail_stop_price, self.direction) {
            (Some(trail), Direction::Long) => close <= trail,
            (Some(trail), Direction::Short) => close >= trail,
            (None, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn long_tier() -> PositionTier {
        PositionTier::open(
            EntryTier::One,
            Direction::Long,
            10,
            date(),
            100.0,
            2.0,
            0.05,
            None,
        )
    }

    #[test]
    fn tier_levels_round_trip() {
        for tier in EntryTier::ALL {
            assert_eq!(EntryTier::from_level(tier.level()), Some(tier));
        }
        assert_eq!(EntryTier::from_level(0), None);
        assert_eq!(EntryTier::from_level(5), None);
    }

    #[test]
    fn tier_gate_chain() {
        assert_eq!(EntryTier::One.previous(), None);
        assert_eq!(EntryTier::Four.previous(), Some(EntryTier::Three));
    }

    #[test]
    fn cycle_unlocks_progressively() {
        let mut cycle = CycleState::new();
        assert!(cycle.is_unlocked(EntryTier::One));
        assert!(!cycle.is_unlocked(EntryTier::Two));

        cycle.mark_entered(EntryTier::One);
        assert!(!cycle.is_unlocked(EntryTier::One), "entered tier stays locked");
        assert!(cycle.is_unlocked(EntryTier::Two));
        assert!(!cycle.is_unlocked(EntryTier::Three));

        cycle.mark_entered(EntryTier::Two);
        assert_eq!(
            cycle.entered().collect::<Vec<_>>(),
            vec![EntryTier::One, EntryTier::Two]
        );

        cycle.reset();
        assert!(cycle.is_empty());
        assert!(cycle.is_unlocked(EntryTier::One));
    }

    #[test]
    fn long_stop_below_entry() {
        let tier = long_tier();
        assert!((tier.stop_price.unwrap() - 95.0).abs() < 1e-9);
        assert!(!tier.stop_breached(95.5, 101.0));
        assert!(tier.stop_breached(94.9, 101.0));
    }

    #[test]
    fn short_stop_above_entry() {
        let tier = PositionTier::open(
            EntryTier::One,
            Direction::Short,
            0,
            date(),
            100.0,
            1.0,
            0.10,
            None,
        );
        assert!((tier.stop_price.unwrap() - 110.0).abs() < 1e-9);
        assert!(tier.stop_breached(90.0, 110.0));
        assert!((tier.market_value(90.0) + 90.0).abs() < 1e-9);
        assert!((tier.unrealized_return(90.0) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn zero_stop_pct_disables_stop() {
        let tier = PositionTier::open(
            EntryTier::One,
            Direction::Long,
            0,
            date(),
            100.0,
            1.0,
            0.0,
            None,
        );
        assert!(tier.stop_price.is_none());
        assert!(!tier.stop_breached(1.0, 1.0));
    }

    #[test]
    fn trail_only_ratchets_up_for_long() {
        let mut tier = long_tier();
        tier.ratchet_trail(110.0, 2.0, 3.0);
        assert_eq!(tier.trail_stop_price, Some(104.0));
        tier.ratchet_trail(105.0, 2.0, 3.0);
        assert_eq!(tier.trail_stop_price, Some(104.0), "trail must not loosen");
        assert!(!tier.trail_crossed(104.5));
        assert!(tier.trail_crossed(103.9));
    }

    #[test]
    fn trail_ignores_undefined_atr() {
        let mut tier = long_tier();
        tier.ratchet_trail(110.0, f64::NAN, 3.0);
        assert!(tier.trail_stop_price.is_none());
        assert!(!tier.trail_crossed(1.0));
    }

    #[test]
    fn closed_below_epsilon() {
        let mut tier = long_tier();
        tier.remaining_size = 1e-12;
        assert!(tier.is_closed());
    }
}
