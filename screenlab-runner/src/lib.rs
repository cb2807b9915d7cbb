//! ScreenLab Runner — file loading, configuration, sweeps, and reports.
//!
//! This crate builds on `screenlab-core` to provide:
//! - Discovery and decoding of `screen_results_YYYY-MM-DD.json[.gz]` files
//! - TOML configuration
//! - Parallel parameter sweeps over one loaded batch
//! - Fingerprinted JSON reports, CSV and Markdown export
//! - Seeded synthetic screen results

pub mod config;
pub mod data_loader;
pub mod export;
pub mod report;
pub mod runner;
pub mod screen_file;
pub mod sweep;
pub mod synthetic;

pub use config::{ConfigError, ScreenLabConfig, SweepConfig};
pub use data_loader::{
    discover_files, load_dir, load_file_path, load_files, FileError, FileSummary, LoadError,
    LoadOptions, LoadedBatch,
};
pub use export::{
    export_json, export_outcomes_csv, export_sweep_csv, import_json, load_artifacts,
    save_artifacts, sweep_markdown,
};
pub use report::{fingerprint, summary_text, SimulationReport, SCHEMA_VERSION};
pub use runner::{load_for_config, run_simulation, run_sweep, RunError};
pub use screen_file::{ScreenFile, TickerEntry};
pub use sweep::{ParamGrid, ParamSweep, SweepEntry, SweepResults};
pub use synthetic::{generate_batch, write_screen_files, SyntheticSpec};
