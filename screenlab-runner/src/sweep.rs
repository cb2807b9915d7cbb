//! Parameter sweeps: one loaded batch, many parameter sets.

use std::cmp::Ordering;

use rayon::prelude::*;
use screenlab_core::{
    compute_aggregate, AggregateStats, DerivedStats, ScreenBatch, SimulationParameters,
};
use serde::{Deserialize, Serialize};

use crate::config::SweepConfig;

/// Parameter grid.
///
/// The grid is the cartesian product of entry thresholds, stop-losses, and
/// trailing variants. `None` in `trailing` runs without the trailing rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub entry_threshold_pct: Vec<f64>,
    pub stop_loss_pct: Vec<f64>,
    /// (take_profit_pct, trailing_stop_pct) pairs.
    pub trailing: Vec<Option<(f64, f64)>>,
}

impl ParamGrid {
    /// Stop-loss levels the dashboard offered, no entry threshold, no trailing.
    pub fn stop_loss_default() -> Self {
        Self::from_config(&SweepConfig::default())
    }

    pub fn from_config(config: &SweepConfig) -> Self {
        let mut trailing = vec![None];
        for &tp in &config.take_profit_pct {
            for &ts in &config.trailing_stop_pct {
                trailing.push(Some((tp, ts)));
            }
        }
        Self {
            entry_threshold_pct: config.entry_threshold_pct.clone(),
            stop_loss_pct: config.stop_loss_pct.clone(),
            trailing,
        }
    }

    /// Returns the total number of parameter sets in this grid.
    pub fn size(&self) -> usize {
        self.entry_threshold_pct.len() * self.stop_loss_pct.len() * self.trailing.len()
    }

    /// Generates all parameter sets, entry threshold varying slowest.
    pub fn generate_params(&self) -> Vec<SimulationParameters> {
        let mut params = Vec::with_capacity(self.size());
        for &entry in &self.entry_threshold_pct {
            for &stop in &self.stop_loss_pct {
                for variant in &self.trailing {
                    let base = SimulationParameters::new(entry, stop);
                    params.push(match *variant {
                        Some((tp, ts)) => base.with_trailing(tp, ts),
                        None => base,
                    });
                }
            }
        }
        params
    }
}

/// Statistics for one parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub params: SimulationParameters,
    pub stats: AggregateStats,
    pub derived: DerivedStats,
}

/// Parameter sweep executor.
///
/// Each parameter set is an independent call to [`compute_aggregate`], so
/// they run on the rayon pool unless parallelism is disabled.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Evaluates every parameter set in `grid` over `batch`.
    pub fn sweep(&self, grid: &ParamGrid, batch: &ScreenBatch) -> SweepResults {
        self.sweep_with_progress(grid, batch, |_, _, _| {})
    }

    /// Executes a sweep with progress reporting.
    ///
    /// The callback receives the entry's grid index, the grid size and the
    /// finished entry. Under parallel execution calls arrive out of order.
    pub fn sweep_with_progress<F>(
        &self,
        grid: &ParamGrid,
        batch: &ScreenBatch,
        progress_callback: F,
    ) -> SweepResults
    where
        F: Fn(usize, usize, &SweepEntry) + Send + Sync,
    {
        let params = grid.generate_params();
        let total = params.len();
        tracing::info!(param_sets = total, parallel = self.parallel, "starting sweep");

        let run = |(idx, p): (usize, &SimulationParameters)| {
            let result = compute_aggregate(batch, p);
            let entry = SweepEntry {
                params: *p,
                derived: result.stats.derived(),
                stats: result.stats,
            };
            progress_callback(idx, total, &entry);
            entry
        };

        let entries: Vec<SweepEntry> = if self.parallel {
            params.par_iter().enumerate().map(run).collect()
        } else {
            params.iter().enumerate().map(run).collect()
        };

        SweepResults::new(entries)
    }
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
}

impl SweepResults {
    fn new(entries: Vec<SweepEntry>) -> Self {
        Self { entries }
    }

    pub fn all(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by average profit, best first. Parameter sets with no
    /// counted trades sort last; ties keep grid order.
    pub fn ranked(&self) -> Vec<&SweepEntry> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            compare_profit(a.derived.average_profit, b.derived.average_profit)
        });
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepEntry> {
        self.ranked().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.ranked().into_iter().next()
    }
}

/// Descending order with `None` last.
fn compare_profit(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
