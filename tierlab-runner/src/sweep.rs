//! Parameter sweep over the ladder's risk and trigger settings.
//!
//! Every grid point is an independent backtest over the same bars. Because the
//! swept parameters never touch indicator settings, the indicator frame is
//! computed once and shared read-only by all workers.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use tierlab_core::domain::{validate_bars, Direction, EntryTier};
use tierlab_core::indicators::IndicatorFrame;
use tierlab_core::signals::Condition;
use tierlab_core::{EngineError, StrategyConfig};

use crate::config::RunConfig;
use crate::data_loader::LoadedData;
use crate::fitness::FitnessMetric;
use crate::runner::{run_backtest_with_frame, BacktestResult, RunError};

/// Sweep parameter grid.
///
/// Defines the values to sweep for each parameter; the grid is their
/// Cartesian product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    /// Tier-1 WT1 oversold level, expressed for the long side (e.g. -53).
    pub tier1_oversold: Vec<f64>,
    /// Fixed stop applied to every tier.
    pub stop_pcts: Vec<f64>,
    pub atr_multipliers: Vec<f64>,
    pub partial_tp_thresholds: Vec<f64>,
    pub max_drawdowns: Vec<f64>,
}

impl ParamGrid {
    /// A 108-point grid around the default ladder.
    pub fn default_btc() -> Self {
        Self {
            tier1_oversold: vec![-60.0, -53.0, -45.0],
            stop_pcts: vec![0.05, 0.08, 0.12],
            atr_multipliers: vec![2.0, 3.0, 4.0],
            partial_tp_thresholds: vec![0.10, 0.20],
            max_drawdowns: vec![0.20, 0.30],
        }
    }

    /// Returns the total number of points in this grid.
    pub fn size(&self) -> usize {
        self.tier1_oversold.len()
            * self.stop_pcts.len()
            * self.atr_multipliers.len()
            * self.partial_tp_thresholds.len()
            * self.max_drawdowns.len()
    }

    /// Every point of the grid, in a fixed nested order.
    pub fn points(&self) -> Vec<SweepPoint> {
        let mut points = Vec::with_capacity(self.size());
        for &tier1_oversold in &self.tier1_oversold {
            for &stop_pct in &self.stop_pcts {
                for &atr_multiplier in &self.atr_multipliers {
                    for &partial_tp_threshold in &self.partial_tp_thresholds {
                        for &max_drawdown in &self.max_drawdowns {
                            points.push(SweepPoint {
                                tier1_oversold,
                                stop_pct,
                                atr_multiplier,
                                partial_tp_threshold,
                                max_drawdown,
                            });
                        }
                    }
                }
            }
        }
        points
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self::default_btc()
    }
}

/// One combination of swept values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub tier1_oversold: f64,
    pub stop_pct: f64,
    pub atr_multiplier: f64,
    pub partial_tp_threshold: f64,
    pub max_drawdown: f64,
}

impl SweepPoint {
    /// The base config with this point's values substituted.
    pub fn apply(&self, base: &RunConfig) -> RunConfig {
        let mut config = base.clone();
        let strategy = &mut config.strategy;
        set_tier1_oversold(strategy, self.tier1_oversold);
        for rule in &mut strategy.tiers {
            rule.stop_pct = self.stop_pct;
        }
        strategy.risk.atr_multiplier = self.atr_multiplier;
        strategy.risk.partial_tp_threshold = self.partial_tp_threshold;
        strategy.risk.max_drawdown = self.max_drawdown;
        config
    }

    pub fn label(&self) -> String {
        format!(
            "os={} stop={:.2} atr={:.1} tp={:.2} dd={:.2}",
            self.tier1_oversold,
            self.stop_pct,
            self.atr_multiplier,
            self.partial_tp_threshold,
            self.max_drawdown
        )
    }
}

/// Replace the tier-1 oversold test, mirrored for short ladders.
///
/// A tier-1 rule without an oversold test gains one.
fn set_tier1_oversold(strategy: &mut StrategyConfig, level: f64) {
    let direction = strategy.direction;
    let Some(rule) = strategy.tiers.iter_mut().find(|r| r.tier == EntryTier::One) else {
        return;
    };
    let replacement = match direction {
        Direction::Long => Condition::Wt1Below { level },
        Direction::Short => Condition::Wt1Above { level: -level },
    };
    let existing = rule.conditions.iter_mut().find(|c| match direction {
        Direction::Long => matches!(c, Condition::Wt1Below { .. }),
        Direction::Short => matches!(c, Condition::Wt1Above { .. }),
    });
    match existing {
        Some(condition) => *condition = replacement,
        None => rule.conditions.push(replacement),
    }
}

/// Parameter sweep executor.
///
/// Runs one backtest per grid point, optionally in parallel.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
    metric: FitnessMetric,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self {
            parallel: true,
            metric: FitnessMetric::default(),
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_metric(mut self, metric: FitnessMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Executes the sweep over `grid` against pre-loaded bars.
    ///
    /// Results come back in grid order whether or not the sweep ran in
    /// parallel. The first failing point aborts the sweep.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &RunConfig,
        loaded: &LoadedData,
    ) -> Result<SweepResults, RunError> {
        base.validate()?;
        validate_bars(&loaded.bars).map_err(EngineError::from)?;
        let frame = IndicatorFrame::compute(&loaded.bars, &base.strategy.indicators);
        let points = grid.points();
        info!(
            points = points.len(),
            parallel = self.parallel,
            metric = ?self.metric,
            "sweep started"
        );

        let run_point = |point: &SweepPoint| -> Result<SweepRun, RunError> {
            let config = point.apply(base);
            let result = run_backtest_with_frame(&config, loaded, &frame)?;
            debug!(
                point = %point.label(),
                total_return = result.metrics.total_return,
                "sweep point done"
            );
            Ok(SweepRun {
                point: *point,
                result,
            })
        };

        let runs: Vec<SweepRun> = if self.parallel {
            points
                .par_iter()
                .map(run_point)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            points
                .iter()
                .map(run_point)
                .collect::<Result<Vec<_>, _>>()?
        };

        info!(runs = runs.len(), "sweep finished");
        Ok(SweepResults::new(runs, self.metric))
    }
}

/// One finished grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRun {
    pub point: SweepPoint,
    pub result: BacktestResult,
}

/// Results from a parameter sweep.
#[derive(Debug)]
pub struct SweepResults {
    runs: Vec<SweepRun>,
    by_run_id: HashMap<String, usize>,
    metric: FitnessMetric,
}

impl SweepResults {
    fn new(runs: Vec<SweepRun>, metric: FitnessMetric) -> Self {
        let by_run_id = runs
            .iter()
            .enumerate()
            .map(|(i, r)| (r.result.run_id.clone(), i))
            .collect();
        Self {
            runs,
            by_run_id,
            metric,
        }
    }

    /// Returns all runs in grid order.
    pub fn all(&self) -> &[SweepRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn metric(&self) -> FitnessMetric {
        self.metric
    }

    /// Gets a run by its run id.
    pub fn get(&self, run_id: &str) -> Option<&SweepRun> {
        self.by_run_id.get(run_id).map(|&i| &self.runs[i])
    }

    /// Returns runs sorted best-first by the sweep's fitness metric.
    ///
    /// Ties keep grid order.
    pub fn sorted_by_fitness(&self) -> Vec<&SweepRun> {
        let metric = self.metric;
        let mut sorted: Vec<_> = self.runs.iter().collect();
        sorted.sort_by(|a, b| metric.rank(&a.result.metrics, &b.result.metrics));
        sorted
    }

    /// Returns the top N runs by fitness.
    pub fn top_n(&self, n: usize) -> Vec<&SweepRun> {
        self.sorted_by_fitness().into_iter().take(n).collect()
    }

    /// Returns the best run by fitness.
    pub fn best(&self) -> Option<&SweepRun> {
        self.sorted_by_fitness().into_iter().next()
    }
}
