//! Sweep ranking metric.
//!
//! Every metric ranks higher-is-better. Max drawdown is stored as a negative
//! fraction, so the shallower drawdown is the larger number.

use crate::metrics::PerformanceMetrics;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Metric a sweep ranks its runs by; `--metric` takes the snake_case name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    #[default]
    Sharpe,
    Sortino,
    Calmar,
    Cagr,
    TotalReturn,
    WinRate,
    ProfitFactor,
    MaxDrawdown,
}

impl FitnessMetric {
    pub const ALL: [FitnessMetric; 8] = [
        Self::Sharpe,
        Self::Sortino,
        Self::Calmar,
        Self::Cagr,
        Self::TotalReturn,
        Self::WinRate,
        Self::ProfitFactor,
        Self::MaxDrawdown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe",
            Self::Sortino => "sortino",
            Self::Calmar => "calmar",
            Self::Cagr => "cagr",
            Self::TotalReturn => "total_return",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::MaxDrawdown => "max_drawdown",
        }
    }

    pub fn extract(self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Self::Sharpe => metrics.sharpe,
            Self::Sortino => metrics.sortino,
            Self::Calmar => metrics.calmar,
            Self::Cagr => metrics.cagr,
            Self::TotalReturn => metrics.total_return,
            Self::WinRate => metrics.win_rate,
            Self::ProfitFactor => metrics.profit_factor,
            Self::MaxDrawdown => metrics.max_drawdown,
        }
    }

    /// Best-first order of two runs under this metric. NaN sorts last.
    pub fn rank(self, a: &PerformanceMetrics, b: &PerformanceMetrics) -> Ordering {
        let (fa, fb) = (self.extract(a), self.extract(b));
        match (fa.is_nan(), fb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => fb.partial_cmp(&fa).unwrap_or(Ordering::Equal),
        }
    }
}

impl std::str::FromStr for FitnessMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|m| m.name()).collect();
                format!("unknown fitness metric '{s}' (expected {})", known.join(", "))
            })
    }
}
