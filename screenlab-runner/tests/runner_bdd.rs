//! BDD tests for the runner: files on disk in, reports and sweeps out.

use std::path::Path;

use chrono::NaiveDate;
use screenlab_core::ExitReason;
use screenlab_runner::{
    export_outcomes_csv, load_artifacts, run_simulation, run_sweep, save_artifacts,
    ScreenLabConfig,
};
use serde_json::json;

const DAY: i64 = 86_400;
/// 2024-01-02 00:00:00 UTC
const JAN_2: i64 = 1_704_153_600;

fn candles(first_ts: i64, closes: &[f64]) -> serde_json::Value {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| json!({"datetime": first_ts + i as i64 * DAY, "close": c, "volume": 1000}))
        .collect()
}

/// One file for 2024-01-02:
/// - STOP: the stop-loss reference series, with two days of chart history
/// - FILT: next-day close below the entry threshold, then a big rally
/// - BAD:  a candle without a close
/// - NONE: listed without data
fn write_fixture(dir: &Path) {
    let mut stop_history = vec![90.0, 91.0];
    stop_history.extend([100.0, 102.0, 101.0, 95.0, 99.0]);
    let content = json!({
        "STOP": {"price_data": {"candles": candles(JAN_2 - 2 * DAY, &stop_history), "score": 0.9}},
        "FILT": {
            "price_data": {"candles": []},
            "filtered_candles": candles(JAN_2, &[50.0, 50.2, 60.0, 70.0]),
        },
        "BAD": {"price_data": {"candles": [
            {"datetime": JAN_2, "close": 10.0},
            {"datetime": JAN_2 + DAY},
        ]}},
        "NONE": null,
    });
    std::fs::write(
        dir.join("screen_results_2024-01-02.json"),
        serde_json::to_vec_pretty(&content).unwrap(),
    )
    .unwrap();
}

fn config_for(dir: &Path) -> ScreenLabConfig {
    let text = format!(
        r#"
        data_dir = "{}"
        lookback_days = 30

        [simulation]
        entry_threshold_pct = 1.0
        stop_loss_pct = -5.0

        [sweep]
        entry_threshold_pct = [1.0]
        stop_loss_pct = [-5.0, -10.0]
        "#,
        dir.display()
    );
    ScreenLabConfig::from_toml_str(&text).unwrap()
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()
}

#[test]
fn bdd_scenario_simulate_a_day_of_screen_results() {
    // GIVEN a data directory with one screen-result file
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let config = config_for(dir.path());

    // WHEN the configured simulation runs
    let report = run_simulation(&config, as_of()).expect("simulation should succeed");

    // THEN the stop-loss series counts as one losing trade
    let stop = &report.outcomes["2024-01-02"]["STOP"];
    assert_eq!(stop.exit_reason, ExitReason::StopLoss);
    assert!((stop.profit_fraction - (95.0 - 102.0) / 102.0).abs() < 1e-9);
    assert_eq!(stop.holding_duration_days, 2);
    assert_eq!(report.stats.total_trades, 1);
    assert_eq!(report.stats.total_wins, 0);

    // AND the filtered series is kept but not counted, despite its profit
    let filt = &report.outcomes["2024-01-02"]["FILT"];
    assert!(filt.entered && filt.filtered);
    assert!(filt.profit_fraction > 0.0);
    assert_eq!(report.stats.filtered_count, 1);

    // AND the malformed series is reported, not simulated
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].ticker, "BAD");
    assert_eq!(report.stats.invalid_count, 1);

    // AND the empty ticker was never entered
    assert_eq!(
        report.outcomes["2024-01-02"]["NONE"].exit_reason,
        ExitReason::NotEntered
    );
    assert_eq!(report.files[0].scores["STOP"], 0.9);
}

#[test]
fn bdd_scenario_files_outside_lookback_are_ignored() {
    // GIVEN the same file, but a window that ends before the signal date
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let config = config_for(dir.path());
    let early = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    // WHEN the simulation runs
    let report = run_simulation(&config, early).unwrap();

    // THEN nothing was loaded and every rate is undefined
    assert!(report.files.is_empty());
    assert_eq!(report.stats.total_trades, 0);
    assert_eq!(report.derived.win_rate, None);
    assert_eq!(report.derived.annualized_return, None);
}

#[test]
fn bdd_scenario_wider_stop_turns_the_trade_into_a_hold() {
    // GIVEN the fixture and a sweep over -5% and -10% stops
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let config = config_for(dir.path());

    // WHEN the sweep runs sequentially
    let results = run_sweep(&config, as_of(), false).unwrap();

    // THEN both grid points are evaluated in grid order
    assert_eq!(results.len(), 2);
    let tight = &results.all()[0];
    let wide = &results.all()[1];
    assert_eq!(tight.stats.stop_loss_exits, 1);
    assert_eq!(wide.stats.holding_exits, 1);
    assert_eq!(wide.stats.total_duration_days, 3);

    // AND the wider stop ranks first (-2.94% beats -6.86%)
    let best = results.best().unwrap();
    assert_eq!(best.params.stop_loss_pct, -10.0);
    assert!((best.derived.average_profit.unwrap() - (99.0 - 102.0) / 102.0).abs() < 1e-9);
}

#[test]
fn bdd_scenario_artifacts_round_trip() {
    // GIVEN a finished simulation
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let report = run_simulation(&config_for(dir.path()), as_of()).unwrap();

    // WHEN its artifacts are saved and reloaded
    let out = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&report, out.path()).unwrap();
    let loaded = load_artifacts(&run_dir).unwrap();

    // THEN the fingerprint and counts survive
    assert_eq!(loaded.fingerprint, report.fingerprint);
    assert_eq!(loaded.stats.total_trades, report.stats.total_trades);

    // AND the CSV has one row per outcome (the failed series has none)
    let csv = export_outcomes_csv(&report).unwrap();
    assert_eq!(csv.lines().count(), 1 + 3);
}

#[test]
fn bdd_scenario_same_inputs_same_fingerprint() {
    // GIVEN two independent runs over the same directory
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let config = config_for(dir.path());

    // WHEN both complete
    let a = run_simulation(&config, as_of()).unwrap();
    let b = run_simulation(&config, as_of()).unwrap();

    // THEN results and fingerprints match
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.stats, b.stats);
    assert_eq!(a.outcomes, b.outcomes);

    // AND changing a parameter changes the fingerprint
    let mut other = config.clone();
    other.simulation.stop_loss_pct = -10.0;
    let c = run_simulation(&other, as_of()).unwrap();
    assert_ne!(a.fingerprint, c.fingerprint);
}
