//! Simulation report — the persisted result of one aggregation run.
//!
//! A report carries everything needed to audit a run: the parameters, the
//! files that were loaded (and skipped), every outcome, every failed series,
//! and the aggregate statistics. `fingerprint` identifies the inputs, so two
//! reports with the same fingerprint were computed from the same data and
//! parameters.

use chrono::{DateTime, Utc};
use screenlab_core::{
    compute_aggregate, AggregateStats, BatchResult, DerivedStats, ExitReason, OutcomeMap,
    ScreenBatch, SeriesFailure, SimulationParameters,
};
use serde::{Deserialize, Serialize};

use crate::data_loader::{FileError, FileSummary, LoadedBatch};

/// Current report schema. Bump on incompatible changes.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    /// BLAKE3 hex digest of the canonical JSON of (params, batch).
    pub fingerprint: String,
    pub params: SimulationParameters,
    pub files: Vec<FileSummary>,
    #[serde(default)]
    pub file_errors: Vec<FileError>,
    pub stats: AggregateStats,
    pub derived: DerivedStats,
    pub outcomes: OutcomeMap,
    pub failures: Vec<SeriesFailure>,
}

/// Content hash of a batch under a parameter set.
///
/// `ScreenBatch` is ordered, so its JSON form is canonical.
pub fn fingerprint(
    params: &SimulationParameters,
    batch: &ScreenBatch,
) -> Result<String, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, &(params, batch))?;
    Ok(hasher.finalize().to_hex().to_string())
}

impl SimulationReport {
    /// Assemble a report from an already computed batch result.
    pub fn from_result(
        params: SimulationParameters,
        loaded: &LoadedBatch,
        result: BatchResult,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            fingerprint: fingerprint(&params, &loaded.batch)?,
            params,
            files: loaded.files.clone(),
            file_errors: loaded.errors.clone(),
            derived: result.stats.derived(),
            stats: result.stats,
            outcomes: result.outcomes,
            failures: result.failures,
        })
    }

    /// Run the aggregator over a loaded batch and wrap the result.
    pub fn run(
        params: SimulationParameters,
        loaded: &LoadedBatch,
    ) -> Result<Self, serde_json::Error> {
        let result = compute_aggregate(&loaded.batch, &params);
        Self::from_result(params, loaded, result)
    }

    /// Outcomes whose trades count towards the statistics.
    pub fn counted_outcomes(&self) -> usize {
        self.outcomes
            .values()
            .flat_map(|m| m.values())
            .filter(|o| o.is_counted())
            .count()
    }
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

/// Human-readable multi-line summary.
pub fn summary_text(report: &SimulationReport) -> String {
    let s = &report.stats;
    let d = &report.derived;
    let p = &report.params;

    let mut out = String::with_capacity(1024);
    out.push_str("=== ScreenLab simulation ===\n");
    out.push_str(&format!("Parameters:     {p}\n"));
    out.push_str(&format!(
        "Files:          {} loaded, {} skipped\n",
        report.files.len(),
        report.file_errors.len()
    ));
    out.push_str(&format!("Trades:         {}\n", s.total_trades));
    out.push_str(&format!(
        "Wins / losses:  {} / {}\n",
        s.total_wins, s.total_losses
    ));
    out.push_str(&format!("Win rate:       {}\n", pct(d.win_rate)));
    out.push_str(&format!("Avg profit:     {}\n", pct(d.average_profit)));
    out.push_str(&format!(
        "Avg duration:   {}\n",
        d.average_duration
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.1} days"))
    ));
    out.push_str(&format!("Annualized:     {}\n", pct(d.annualized_return)));
    out.push_str(&format!(
        "Exits:          {} {}, {} {}, {} {}\n",
        s.stop_loss_exits,
        ExitReason::StopLoss,
        s.trailing_stop_exits,
        ExitReason::TrailingStop,
        s.holding_exits,
        ExitReason::Holding
    ));
    out.push_str(&format!(
        "Excluded:       {} filtered, {} not entered, {} invalid\n",
        s.filtered_count, s.not_entered_count, s.invalid_count
    ));
    out.push_str(&format!("Fingerprint:    {}\n", report.fingerprint));
    out
}
