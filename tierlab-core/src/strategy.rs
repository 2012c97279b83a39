//! Strategy configuration: tier table, exit rules, risk limits and indicator
//! parameters, plus its deterministic fingerprint.

use crate::domain::{Direction, EntryTier};
use crate::indicators::IndicatorParams;
use crate::signals::{default_long_tiers, ExitRules, TierRule};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ladder-wide risk limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParams {
    /// Breaker threshold as a fraction of peak equity.
    pub max_drawdown: f64,
    /// ATR multiple of the trailing stop distance.
    pub atr_multiplier: f64,
    /// Unrealized return a tier needs before a partial take-profit.
    pub partial_tp_threshold: f64,
    /// Share of the remaining size sold on a partial take-profit.
    pub partial_fraction: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            max_drawdown: 0.30,
            atr_multiplier: 3.0,
            partial_tp_threshold: 0.10,
            partial_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("tier table is empty")]
    EmptyTierTable,

    #[error("tier table must run contiguously from tier 1; found {found} at position {position}")]
    TierOutOfOrder { position: usize, found: EntryTier },

    #[error("{tier} has no conditions")]
    NoConditions { tier: EntryTier },

    #[error("{tier} size_fraction must be in (0, 1], got {value}")]
    InvalidSizeFraction { tier: EntryTier, value: f64 },

    #[error("{tier} stop_pct must be in [0, 1), got {value}")]
    InvalidStop { tier: EntryTier, value: f64 },

    #[error("invalid risk parameter: {0}")]
    InvalidRisk(String),

    #[error("invalid indicator parameters: {0}")]
    InvalidIndicators(String),
}

/// Complete strategy definition for one backtest.
///
/// Missing TOML tables fall back to the default long ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub direction: Direction,
    pub tiers: Vec<TierRule>,
    pub exits: ExitRules,
    pub risk: RiskParams,
    pub indicators: IndicatorParams,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Long,
            tiers: default_long_tiers(),
            exits: ExitRules::default(),
            risk: RiskParams::default(),
            indicators: IndicatorParams::default(),
        }
    }
}

impl StrategyConfig {
    /// Opposite-direction ladder with every condition swapped for its twin.
    pub fn mirrored(&self) -> StrategyConfig {
        StrategyConfig {
            direction: self.direction.opposite(),
            tiers: self.tiers.iter().map(TierRule::mirrored).collect(),
            exits: self.exits.mirrored(),
            risk: self.risk.clone(),
            indicators: self.indicators.clone(),
        }
    }

    pub fn rule(&self, tier: EntryTier) -> Option<&TierRule> {
        self.tiers.iter().find(|r| r.tier == tier)
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.tiers.is_empty() {
            return Err(StrategyError::EmptyTierTable);
        }
        for (position, rule) in self.tiers.iter().enumerate() {
            if usize::from(rule.tier.level()) != position + 1 {
                return Err(StrategyError::TierOutOfOrder {
                    position,
                    found: rule.tier,
                });
            }
            if rule.conditions.is_empty() {
                return Err(StrategyError::NoConditions { tier: rule.tier });
            }
            if !(rule.size_fraction > 0.0 && rule.size_fraction <= 1.0) {
                return Err(StrategyError::InvalidSizeFraction {
                    tier: rule.tier,
                    value: rule.size_fraction,
                });
            }
            if !(rule.stop_pct >= 0.0 && rule.stop_pct < 1.0) {
                return Err(StrategyError::InvalidStop {
                    tier: rule.tier,
                    value: rule.stop_pct,
                });
            }
        }

        let risk = &self.risk;
        if !(risk.max_drawdown > 0.0 && risk.max_drawdown <= 1.0) {
            return Err(StrategyError::InvalidRisk(format!(
                "max_drawdown must be in (0, 1], got {}",
                risk.max_drawdown
            )));
        }
        if !(risk.atr_multiplier > 0.0 && risk.atr_multiplier.is_finite()) {
            return Err(StrategyError::InvalidRisk(format!(
                "atr_multiplier must be positive, got {}",
                risk.atr_multiplier
            )));
        }
        if !(risk.partial_fraction > 0.0 && risk.partial_fraction <= 1.0) {
            return Err(StrategyError::InvalidRisk(format!(
                "partial_fraction must be in (0, 1], got {}",
                risk.partial_fraction
            )));
        }
        if !(risk.partial_tp_threshold >= 0.0 && risk.partial_tp_threshold.is_finite()) {
            return Err(StrategyError::InvalidRisk(format!(
                "partial_tp_threshold must be non-negative, got {}",
                risk.partial_tp_threshold
            )));
        }

        let problems = self.indicators.problems();
        if !problems.is_empty() {
            return Err(StrategyError::InvalidIndicators(problems.join("; ")));
        }
        Ok(())
    }

    /// BLAKE3 hash of the canonical JSON form, hex encoded.
    ///
    /// Identical configurations always hash identically; any parameter change
    /// produces a different hash.
    pub fn full_hash(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Condition;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(StrategyConfig::default().validate(), Ok(()));
    }

    #[test]
    fn mirrored_config_is_valid_short() {
        let short = StrategyConfig::default().mirrored();
        assert_eq!(short.direction, Direction::Short);
        assert_eq!(short.validate(), Ok(()));
        assert_eq!(short.mirrored(), StrategyConfig::default());
    }

    #[test]
    fn empty_table_rejected() {
        let cfg = StrategyConfig {
            tiers: Vec::new(),
            ..StrategyConfig::default()
        };
        assert_eq!(cfg.validate(), Err(StrategyError::EmptyTierTable));
    }

    #[test]
    fn gap_in_ladder_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.tiers.remove(1);
        assert!(matches!(
            cfg.validate(),
            Err(StrategyError::TierOutOfOrder {
                position: 1,
                found: EntryTier::Three
            })
        ));
    }

    #[test]
    fn bad_size_fraction_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.tiers[2].size_fraction = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(StrategyError::InvalidSizeFraction { .. })
        ));
    }

    #[test]
    fn negative_stop_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.tiers[0].stop_pct = -0.1;
        assert!(matches!(cfg.validate(), Err(StrategyError::InvalidStop { .. })));
    }

    #[test]
    fn empty_conditions_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.tiers[0].conditions.clear();
        assert!(matches!(cfg.validate(), Err(StrategyError::NoConditions { .. })));
    }

    #[test]
    fn bad_risk_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.risk.atr_multiplier = 0.0;
        assert!(matches!(cfg.validate(), Err(StrategyError::InvalidRisk(_))));

        let mut cfg = StrategyConfig::default();
        cfg.risk.max_drawdown = 0.0;
        assert!(matches!(cfg.validate(), Err(StrategyError::InvalidRisk(_))));
    }

    #[test]
    fn bad_indicators_rejected() {
        let mut cfg = StrategyConfig::default();
        cfg.indicators.atr_len = 0;
        assert!(matches!(
            cfg.validate(),
            Err(StrategyError::InvalidIndicators(_))
        ));
    }

    #[test]
    fn full_hash_deterministic_and_sensitive() {
        let a = StrategyConfig::default();
        let b = StrategyConfig::default();
        assert_eq!(a.full_hash(), b.full_hash());
        assert_eq!(a.full_hash().len(), 64);

        let mut c = StrategyConfig::default();
        c.tiers[0].conditions[0] = Condition::Wt1Below { level: -60.0 };
        assert_ne!(a.full_hash(), c.full_hash());
    }

    #[test]
    fn toml_round_trip() {
        let cfg = StrategyConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: StrategyConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn partial_toml_keeps_default_ladder() {
        let cfg: StrategyConfig = toml::from_str(
            r#"
            [risk]
            max_drawdown = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.risk.max_drawdown, 0.2);
        assert_eq!(cfg.risk.atr_multiplier, 3.0);
        assert_eq!(cfg.tiers, StrategyConfig::default().tiers);
        assert_eq!(cfg.direction, Direction::Long);
    }

    #[test]
    fn rule_lookup() {
        let cfg = StrategyConfig::default();
        assert_eq!(cfg.rule(EntryTier::Three).unwrap().tier, EntryTier::Three);
    }
}
