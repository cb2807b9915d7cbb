//! ScreenLab CLI — simulate the trades behind daily screen results.
//!
//! Commands:
//! - `files` — list screen-result files in the configured window
//! - `simulate` — simulate every signal and print aggregate statistics
//! - `sweep` — evaluate a grid of entry / stop-loss / trailing parameters
//! - `synth` — write seeded synthetic screen-result files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use screenlab_core::SimulationParameters;
use screenlab_runner::runner::load_options;
use screenlab_runner::{
    discover_files, export_json, export_outcomes_csv, export_sweep_csv, load_files,
    run_simulation, run_sweep, save_artifacts, summary_text, sweep_markdown, write_screen_files,
    ScreenLabConfig, SyntheticSpec,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "screenlab",
    about = "ScreenLab CLI — trade-outcome simulation over daily screen results"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where to load screen results from. Flags override the config file.
#[derive(Args)]
struct DataArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding screen_results_YYYY-MM-DD.json[.gz] files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Days of screen results to load, ending at --as-of.
    #[arg(long)]
    days: Option<u32>,

    /// Last signal date to load (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long)]
    as_of: Option<String>,
}

/// Simulation parameters in percent. Flags override the config file.
#[derive(Args)]
struct ParamArgs {
    /// Minimum next-day rise over the signal close, e.g. 1.0.
    #[arg(long, allow_negative_numbers = true)]
    entry_threshold: Option<f64>,

    /// Stop-loss relative to the buy price, e.g. -5.0.
    #[arg(long, allow_negative_numbers = true)]
    stop_loss: Option<f64>,

    /// Gain that arms the trailing stop, e.g. 10.0.
    #[arg(long, allow_negative_numbers = true)]
    take_profit: Option<f64>,

    /// Trailing distance below the peak, e.g. -3.0.
    #[arg(long, allow_negative_numbers = true)]
    trailing_stop: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List screen-result files in the lookback window.
    Files {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Simulate every signal and print aggregate statistics.
    Simulate {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        params: ParamArgs,

        /// Print the full report as JSON instead of the text summary.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write per-outcome CSV to this path.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Save report.json, outcomes.csv and summary.txt under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Evaluate a parameter grid over one loaded batch.
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Entry thresholds, comma separated (e.g. 0,0.5,1).
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        entry_thresholds: Vec<f64>,

        /// Stop-loss levels, comma separated (e.g. -2,-5,-10).
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        stop_losses: Vec<f64>,

        /// Take-profit levels for the trailing rule, comma separated.
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        take_profits: Vec<f64>,

        /// Trailing distances, comma separated.
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        trailing_stops: Vec<f64>,

        /// Number of ranked entries to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Evaluate grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write the ranked sweep as CSV to this path.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Write seeded synthetic screen-result files.
    Synth {
        /// Output directory.
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,

        /// First signal date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-02")]
        start: String,

        /// Number of signal dates.
        #[arg(long, default_value_t = 5)]
        days: u32,

        /// Tickers per file.
        #[arg(long, default_value_t = 20)]
        tickers: usize,

        /// Candles after each signal date.
        #[arg(long, default_value_t = 20)]
        forward_days: u32,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Write .json.gz instead of .json.
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Files { data } => run_files(&data),
        Commands::Simulate {
            data,
            params,
            json,
            csv,
            output_dir,
        } => run_simulate(&data, &params, json, csv, output_dir),
        Commands::Sweep {
            data,
            entry_thresholds,
            stop_losses,
            take_profits,
            trailing_stops,
            top,
            sequential,
            csv,
        } => {
            let grid = GridArgs {
                entry_thresholds,
                stop_losses,
                take_profits,
                trailing_stops,
            };
            run_sweep_cmd(&data, grid, top, sequential, csv)
        }
        Commands::Synth {
            out_dir,
            start,
            days,
            tickers,
            forward_days,
            seed,
            gzip,
        } => {
            let spec = SyntheticSpec {
                start: parse_date(&start)?,
                signal_days: days,
                tickers,
                forward_days,
                seed,
                ..SyntheticSpec::default()
            };
            run_synth(&out_dir, &spec, gzip)
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}

impl DataArgs {
    /// Config file (or defaults) with flag overrides, plus the as-of date.
    fn resolve(&self) -> Result<(ScreenLabConfig, NaiveDate)> {
        let mut config = ScreenLabConfig::load_or_default(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(days) = self.days {
            config.lookback_days = Some(days);
        }
        let as_of = match &self.as_of {
            Some(s) => parse_date(s)?,
            None => Utc::now().date_naive(),
        };
        tracing::debug!(
            data_dir = %config.data_dir.display(),
            lookback_days = ?config.lookback_days,
            %as_of,
            "resolved data arguments"
        );
        Ok((config, as_of))
    }
}

impl ParamArgs {
    fn apply(&self, params: &mut SimulationParameters) {
        if let Some(v) = self.entry_threshold {
            params.entry_threshold_pct = v;
        }
        if let Some(v) = self.stop_loss {
            params.stop_loss_pct = v;
        }
        if let Some(v) = self.take_profit {
            params.take_profit_pct = Some(v);
        }
        if let Some(v) = self.trailing_stop {
            params.trailing_stop_pct = Some(v);
        }
    }
}

struct GridArgs {
    entry_thresholds: Vec<f64>,
    stop_losses: Vec<f64>,
    take_profits: Vec<f64>,
    trailing_stops: Vec<f64>,
}

fn run_files(data: &DataArgs) -> Result<()> {
    let (config, as_of) = data.resolve()?;
    let files = discover_files(&config.data_dir, &load_options(&config, as_of))?;
    if files.is_empty() {
        println!("No screen results in {}", config.data_dir.display());
        return Ok(());
    }

    let loaded = load_files(&files, true);
    println!("{:<12} {:>8} {:>10}  file", "date", "tickers", "top score");
    for summary in &loaded.files {
        let top = summary
            .scores
            .values()
            .copied()
            .max_by(f64::total_cmp)
            .map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
        println!(
            "{:<12} {:>8} {:>10}  {}",
            summary.date,
            summary.ticker_count,
            top,
            summary.path.display()
        );
    }
    for err in &loaded.errors {
        println!("SKIPPED {}: {}", err.path.display(), err.message);
    }
    Ok(())
}

fn run_simulate(
    data: &DataArgs,
    params: &ParamArgs,
    json: bool,
    csv: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let (mut config, as_of) = data.resolve()?;
    params.apply(&mut config.simulation);
    if config.simulation.trailing_half_configured() {
        tracing::warn!(
            take_profit_pct = ?config.simulation.take_profit_pct,
            trailing_stop_pct = ?config.simulation.trailing_stop_pct,
            "trailing stop needs both --take-profit and --trailing-stop; rule disabled"
        );
    }

    let report = run_simulation(&config, as_of)?;

    if json {
        println!("{}", export_json(&report)?);
    } else {
        println!();
        print!("{}", summary_text(&report));
        for err in &report.file_errors {
            println!("WARNING: skipped {}: {}", err.path.display(), err.message);
        }
        for failure in &report.failures {
            println!(
                "WARNING: {} {} not simulated: {}",
                failure.date, failure.ticker, failure.error
            );
        }
    }

    if let Some(path) = csv {
        std::fs::write(&path, export_outcomes_csv(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Outcomes written to: {}", path.display());
    }
    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(&report, &dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_sweep_cmd(
    data: &DataArgs,
    grid: GridArgs,
    top: usize,
    sequential: bool,
    csv: Option<PathBuf>,
) -> Result<()> {
    let (mut config, as_of) = data.resolve()?;
    let sweep = &mut config.sweep;
    for (flag, target) in [
        (grid.entry_thresholds, &mut sweep.entry_threshold_pct),
        (grid.stop_losses, &mut sweep.stop_loss_pct),
        (grid.take_profits, &mut sweep.take_profit_pct),
        (grid.trailing_stops, &mut sweep.trailing_stop_pct),
    ] {
        if !flag.is_empty() {
            *target = flag;
        }
    }
    if sweep.take_profit_pct.is_empty() != sweep.trailing_stop_pct.is_empty() {
        tracing::warn!(
            "trailing sweep needs both --take-profits and --trailing-stops; only stop-loss grid points run"
        );
    }

    let results = run_sweep(&config, as_of, !sequential)?;
    println!("{}", sweep_markdown(&results, top));
    match results.best() {
        Some(best) if best.derived.average_profit.is_some() => println!(
            "Best: {} ({} trades)",
            best.params, best.stats.total_trades
        ),
        _ => println!("No parameter set produced a counted trade."),
    }

    if let Some(path) = csv {
        std::fs::write(&path, export_sweep_csv(&results)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Sweep written to: {}", path.display());
    }
    Ok(())
}

fn run_synth(out_dir: &Path, spec: &SyntheticSpec, gzip: bool) -> Result<()> {
    let paths = write_screen_files(out_dir, spec, gzip)?;
    println!(
        "Wrote {} files ({} tickers each) to {}",
        paths.len(),
        spec.tickers,
        out_dir.display()
    );
    Ok(())
}
