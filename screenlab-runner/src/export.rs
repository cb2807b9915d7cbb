//! Export — JSON, CSV, and Markdown artifacts for simulation runs.
//!
//! - **JSON**: full report round trip with schema versioning
//! - **CSV**: one row per (date, ticker) outcome, one row per sweep entry
//! - **Markdown**: sweep leaderboard table
//!
//! Reports newer than [`SCHEMA_VERSION`] are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::report::{summary_text, SimulationReport, SCHEMA_VERSION};
use crate::sweep::SweepResults;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &SimulationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize SimulationReport to JSON")
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<SimulationReport> {
    let report: SimulationReport =
        serde_json::from_str(json).context("failed to deserialize SimulationReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn opt_price(v: Option<f64>) -> String {
    v.map(|p| format!("{p:.4}")).unwrap_or_default()
}

fn opt_value(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn opt_rate(v: Option<f64>) -> String {
    v.map(|r| format!("{r:.6}")).unwrap_or_default()
}

/// One row per outcome, ordered by date then ticker.
///
/// Columns: date, ticker, entered, filtered, exit_reason, profit_fraction,
/// holding_days, is_win, signal_price, buy_price, exit_price, peak_price,
/// invalid_price
pub fn export_outcomes_csv(report: &SimulationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "date",
        "ticker",
        "entered",
        "filtered",
        "exit_reason",
        "profit_fraction",
        "holding_days",
        "is_win",
        "signal_price",
        "buy_price",
        "exit_price",
        "peak_price",
        "invalid_price",
    ])?;

    for (date, by_ticker) in &report.outcomes {
        for (ticker, o) in by_ticker {
            wtr.write_record([
                date.clone(),
                ticker.clone(),
                o.entered.to_string(),
                o.filtered.to_string(),
                o.exit_reason.name().to_string(),
                format!("{:.6}", o.profit_fraction),
                o.holding_duration_days.to_string(),
                o.is_win.to_string(),
                opt_price(o.signal_price),
                opt_price(o.buy_price),
                opt_price(o.exit_price),
                opt_price(o.peak_price),
                opt_price(o.invalid_price),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per sweep entry in ranked order.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "entry_threshold_pct",
        "stop_loss_pct",
        "take_profit_pct",
        "trailing_stop_pct",
        "trades",
        "wins",
        "filtered",
        "win_rate",
        "average_profit",
        "average_duration",
        "annualized_return",
    ])?;

    for (i, e) in results.ranked().into_iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            e.params.entry_threshold_pct.to_string(),
            e.params.stop_loss_pct.to_string(),
            opt_value(e.params.take_profit_pct),
            opt_value(e.params.trailing_stop_pct),
            e.stats.total_trades.to_string(),
            e.stats.total_wins.to_string(),
            e.stats.filtered_count.to_string(),
            opt_rate(e.derived.win_rate),
            opt_rate(e.derived.average_profit),
            opt_rate(e.derived.average_duration),
            opt_rate(e.derived.annualized_return),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown ───────────────────────────────────────────────────────

/// Markdown leaderboard of the top `n` sweep entries.
pub fn sweep_markdown(results: &SweepResults, n: usize) -> String {
    fn pct(v: Option<f64>) -> String {
        v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
    }

    let mut md = String::with_capacity(1024);
    md.push_str("# Parameter Sweep\n\n");
    md.push_str(
        "| # | Entry | Stop | Trailing | Trades | Win Rate | Avg Profit | Annualized |\n",
    );
    md.push_str("| ---: | ---: | ---: | --- | ---: | ---: | ---: | ---: |\n");
    for (i, e) in results.top_n(n).into_iter().enumerate() {
        let trailing = match (e.params.take_profit_pct, e.params.trailing_stop_pct) {
            (Some(tp), Some(ts)) => format!("{:.1}% after +{tp:.1}%", ts.abs()),
            _ => "-".to_string(),
        };
        md.push_str(&format!(
            "| {} | {:.1}% | {:.1}% | {} | {} | {} | {} | {} |\n",
            i + 1,
            e.params.entry_threshold_pct,
            e.params.stop_loss_pct,
            trailing,
            e.stats.total_trades,
            pct(e.derived.win_rate),
            pct(e.derived.average_profit),
            pct(e.derived.annualized_return),
        ));
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one simulation run.
///
/// Creates `run_{timestamp}_{fingerprint prefix}/` under `output_dir` with:
/// - `report.json` — the full `SimulationReport`
/// - `outcomes.csv` — one row per outcome
/// - `summary.txt` — the plain-text summary
///
/// Returns the created directory.
pub fn save_artifacts(report: &SimulationReport, output_dir: &Path) -> Result<PathBuf> {
    let short = report.fingerprint.get(..12).unwrap_or(&report.fingerprint);
    let dirname = format!(
        "run_{}_{}",
        report.generated_at.format("%Y%m%d_%H%M%S"),
        short
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("outcomes.csv"), export_outcomes_csv(report)?)?;
    std::fs::write(run_dir.join("summary.txt"), summary_text(report))?;

    tracing::info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}

/// Load a report from an artifact directory's `report.json`.
pub fn load_artifacts(dir: &Path) -> Result<SimulationReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::LoadedBatch;
    use crate::sweep::{ParamGrid, ParamSweep};
    use screenlab_core::{RawCandle, SimulationParameters};
    use std::collections::BTreeMap;

    const DAY: i64 = 86_400;

    fn sample_loaded() -> LoadedBatch {
        let mut by_ticker = BTreeMap::new();
        for (ticker, closes) in [
            ("AAA", vec![100.0, 102.0, 101.0, 95.0, 99.0]),
            ("BBB", vec![50.0, 50.0, 51.0]),
            ("CCC", vec![10.0]),
        ] {
            let candles: Vec<RawCandle> = closes
                .iter()
                .enumerate()
                .map(|(i, &c)| RawCandle::from_close(i as i64 * DAY, c))
                .collect();
            by_ticker.insert(ticker.to_string(), candles);
        }
        let mut loaded = LoadedBatch::default();
        loaded.batch.insert("2024-01-02".to_string(), by_ticker);
        loaded
    }

    fn sample_report() -> SimulationReport {
        SimulationReport::run(SimulationParameters::new(1.0, -5.0), &sample_loaded()).unwrap()
    }

    #[test]
    fn json_roundtrip() {
        let report = sample_report();
        let json = export_json(&report).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.fingerprint, report.fingerprint);
        assert_eq!(back.stats.total_trades, report.stats.total_trades);
        assert_eq!(back.outcomes.keys().collect::<Vec<_>>(), vec!["2024-01-02"]);
        assert_eq!(back.outcomes["2024-01-02"].len(), 3);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&report).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn undefined_rates_serialize_as_null() {
        let report =
            SimulationReport::run(SimulationParameters::default(), &LoadedBatch::default()).unwrap();
        let json = export_json(&report).unwrap();
        assert!(json.contains("\"win_rate\": null"));
    }

    #[test]
    fn csv_outcomes_header_and_rows() {
        let csv = export_outcomes_csv(&sample_report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "date,ticker,entered,filtered,exit_reason,profit_fraction,holding_days,is_win,\
             signal_price,buy_price,exit_price,peak_price,invalid_price"
        );
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("2024-01-02,AAA,true,false,stop_loss,"));
        // BBB never rose above the threshold.
        assert!(lines[2].starts_with("2024-01-02,BBB,true,true,"));
        assert!(lines[3].starts_with("2024-01-02,CCC,false,false,not_entered,"));
    }

    #[test]
    fn csv_sweep_ranked_rows() {
        let results = ParamSweep::new()
            .with_parallelism(false)
            .sweep(&ParamGrid::stop_loss_default(), &sample_loaded().batch);
        let csv = export_sweep_csv(&results).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("rank,entry_threshold_pct,stop_loss_pct"));
        assert_eq!(lines.len(), 1 + results.len());
        assert!(lines[1].starts_with("1,"));
    }

    #[test]
    fn markdown_sweep_table() {
        let results =
            ParamSweep::new().sweep(&ParamGrid::stop_loss_default(), &sample_loaded().batch);
        let md = sweep_markdown(&results, 2);
        assert!(md.contains("# Parameter Sweep"));
        let rows = md.lines().filter(|l| l.contains('%')).count();
        assert_eq!(rows, 2);
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let run_dir = save_artifacts(&report, dir.path()).unwrap();

        assert!(run_dir.join("report.json").exists());
        assert!(run_dir.join("outcomes.csv").exists());
        assert!(run_dir.join("summary.txt").exists());

        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.fingerprint, report.fingerprint);
    }
}
