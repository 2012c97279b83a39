//! Serializable run configuration.
//!
//! A run config is a TOML file with a `[backtest]` table (name, data source,
//! date window, capital) and a `[strategy]` table that deserializes straight
//! into `StrategyConfig`. Omitted strategy tables fall back to the default
//! long ladder.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tierlab_core::{EngineConfig, StrategyConfig, StrategyError};

/// Errors from reading or validating a run config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("[backtest] needs exactly one of `data` or `synthetic`")]
    DataSource,

    #[error("start_date {start} is after end_date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error("initial_capital must be positive, got {0}")]
    Capital(f64),

    #[error("invalid strategy: {0}")]
    Strategy(#[from] StrategyError),
}

/// Parameters of a seeded synthetic price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    pub seed: u64,
    #[serde(default = "default_synthetic_bars")]
    pub bars: usize,
    #[serde(default = "default_start_price")]
    pub start_price: f64,
    #[serde(default = "default_synthetic_start")]
    pub start_date: NaiveDate,
}

fn default_synthetic_bars() -> usize {
    1000
}

fn default_start_price() -> f64 {
    20_000.0
}

fn default_synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

fn default_initial_capital() -> f64 {
    10_000.0
}

/// The `[backtest]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub name: String,
    /// CSV with header `date,open,high,low,close,volume`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic: Option<SyntheticSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// No entries before this bar index.
    #[serde(default)]
    pub warmup_bars: usize,
}

/// Complete, reproducible description of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl RunConfig {
    /// Load and validate a run config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a run config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bt = &self.backtest;
        if bt.data.is_some() == bt.synthetic.is_some() {
            return Err(ConfigError::DataSource);
        }
        if let (Some(start), Some(end)) = (bt.start_date, bt.end_date) {
            if start > end {
                return Err(ConfigError::DateRange { start, end });
            }
        }
        if !(bt.initial_capital.is_finite() && bt.initial_capital > 0.0) {
            return Err(ConfigError::Capital(bt.initial_capital));
        }
        self.strategy.validate()?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::with_warmup(self.backtest.initial_capital, self.backtest.warmup_bars)
    }

    /// Deterministic hash of this config combined with the dataset hash.
    ///
    /// Two runs with the same id produce identical results.
    pub fn run_id(&self, dataset_hash: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.backtest.name.as_bytes());
        hasher.update(&self.backtest.initial_capital.to_le_bytes());
        hasher.update(&(self.backtest.warmup_bars as u64).to_le_bytes());
        hasher.update(self.strategy.full_hash().as_bytes());
        hasher.update(dataset_hash.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierlab_core::domain::Direction;

    const MINIMAL: &str = r#"
[backtest]
name = "btc_daily"
data = "data/btc.csv"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.backtest.name, "btc_daily");
        assert_eq!(config.backtest.data, Some(PathBuf::from("data/btc.csv")));
        assert_eq!(config.backtest.initial_capital, 10_000.0);
        assert_eq!(config.strategy, StrategyConfig::default());
    }

    #[test]
    fn synthetic_source_and_strategy_overrides() {
        let config = RunConfig::from_toml(
            r#"
[backtest]
name = "synthetic"
initial_capital = 50000.0
start_date = "2020-03-01"
synthetic = { seed = 7, bars = 500 }

[strategy]
direction = "long"

[strategy.risk]
max_drawdown = 0.25
atr_multiplier = 2.5
"#,
        )
        .unwrap();
        let synthetic = config.backtest.synthetic.as_ref().unwrap();
        assert_eq!(synthetic.seed, 7);
        assert_eq!(synthetic.bars, 500);
        assert_eq!(synthetic.start_price, 20_000.0);
        assert_eq!(config.strategy.risk.max_drawdown, 0.25);
        assert_eq!(config.strategy.risk.partial_fraction, 0.5);
        assert_eq!(config.strategy.direction, Direction::Long);
        assert_eq!(
            config.backtest.start_date,
            NaiveDate::from_ymd_opt(2020, 3, 1)
        );
    }

    #[test]
    fn both_or_neither_source_rejected() {
        let neither = "[backtest]\nname = \"x\"\n";
        assert!(matches!(
            RunConfig::from_toml(neither),
            Err(ConfigError::DataSource)
        ));

        let both = "[backtest]\nname = \"x\"\ndata = \"a.csv\"\nsynthetic = { seed = 1 }\n";
        assert!(matches!(
            RunConfig::from_toml(both),
            Err(ConfigError::DataSource)
        ));
    }

    #[test]
    fn inverted_window_rejected() {
        let text = r#"
[backtest]
name = "x"
data = "a.csv"
start_date = "2024-02-01"
end_date = "2024-01-01"
"#;
        assert!(matches!(
            RunConfig::from_toml(text),
            Err(ConfigError::DateRange { .. })
        ));
    }

    #[test]
    fn invalid_strategy_rejected() {
        let text = r#"
[backtest]
name = "x"
data = "a.csv"

[strategy.risk]
partial_fraction = 0.0
"#;
        assert!(matches!(
            RunConfig::from_toml(text),
            Err(ConfigError::Strategy(StrategyError::InvalidRisk(_)))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let config = RunConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.run_id("abc"), config.run_id("abc"));
        assert_ne!(config.run_id("abc"), config.run_id("abd"));

        let mut changed = config.clone();
        changed.strategy.risk.atr_multiplier = 2.0;
        assert_ne!(config.run_id("abc"), changed.run_id("abc"));
    }
}
