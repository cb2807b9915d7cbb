//! Run orchestration — wires together config, loading, and the core.
//!
//! Two entry points:
//! - `run_simulation()`: loads the configured window and aggregates once.
//! - `run_sweep()`: loads once, then evaluates every grid point.

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::{ConfigError, ScreenLabConfig};
use crate::data_loader::{load_dir, LoadError, LoadOptions, LoadedBatch};
use crate::report::SimulationReport;
use crate::sweep::{ParamGrid, ParamSweep, SweepResults};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),
}

/// Load options for a config's lookback window ending at `as_of`.
pub fn load_options(config: &ScreenLabConfig, as_of: NaiveDate) -> LoadOptions {
    LoadOptions {
        as_of: Some(as_of),
        lookback_days: config.lookback_days,
        parallel: true,
    }
}

/// Load every screen file the config selects.
pub fn load_for_config(
    config: &ScreenLabConfig,
    as_of: NaiveDate,
) -> Result<LoadedBatch, RunError> {
    config.validate()?;
    let loaded = load_dir(&config.data_dir, &load_options(config, as_of))?;
    tracing::info!(
        files = loaded.files.len(),
        skipped = loaded.errors.len(),
        series = loaded.series_count(),
        "loaded screen results"
    );
    Ok(loaded)
}

/// Load and aggregate with `config.simulation`.
pub fn run_simulation(
    config: &ScreenLabConfig,
    as_of: NaiveDate,
) -> Result<SimulationReport, RunError> {
    let loaded = load_for_config(config, as_of)?;
    Ok(SimulationReport::run(config.simulation, &loaded)?)
}

/// Load once and sweep the grid from `config.sweep`.
pub fn run_sweep(
    config: &ScreenLabConfig,
    as_of: NaiveDate,
    parallel: bool,
) -> Result<SweepResults, RunError> {
    let loaded = load_for_config(config, as_of)?;
    let grid = ParamGrid::from_config(&config.sweep);
    Ok(ParamSweep::new()
        .with_parallelism(parallel)
        .sweep(&grid, &loaded.batch))
}
