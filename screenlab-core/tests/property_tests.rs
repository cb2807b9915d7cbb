//! Property tests for simulator and aggregator invariants.
//!
//! Uses proptest to verify:
//! 1. Normalization is idempotent and never drops or duplicates records
//! 2. Not-entered outcomes are zeroed; short series are never entered
//! 3. Filtered outcomes never reach the aggregate sums
//! 4. total_trades equals the number of entered, unfiltered outcomes
//! 5. Aggregation is deterministic and independent of input order

use proptest::prelude::*;
use screenlab_core::{
    compute_aggregate, normalize, simulate_closes, ExitReason, RawCandle, ScreenBatch,
    SimulationParameters,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_close() -> impl Strategy<Value = f64> {
    (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_close(), 0..30)
}

fn arb_params() -> impl Strategy<Value = SimulationParameters> {
    (
        -5.0..10.0_f64,
        -25.0..5.0_f64,
        prop::option::of((0.0..30.0_f64, -15.0..0.0_f64)),
    )
        .prop_map(|(entry, stop, trail)| {
            let p = SimulationParameters::new(entry, stop);
            match trail {
                Some((tp, ts)) => p.with_trailing(tp, ts),
                None => p,
            }
        })
}

fn to_raw(closes: &[f64]) -> Vec<RawCandle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| RawCandle::from_close(i as i64 * 86_400, c))
        .collect()
}

fn arb_batch() -> impl Strategy<Value = ScreenBatch> {
    prop::collection::btree_map(
        "2024-0[1-9]-[12][0-9]",
        prop::collection::btree_map("[A-Z]{1,4}", arb_closes().prop_map(|c| to_raw(&c)), 0..6),
        0..5,
    )
}

// ── 1. Normalization ─────────────────────────────────────────────────

proptest! {
    /// Normalizing an already-sorted series changes nothing.
    #[test]
    fn normalize_is_idempotent(closes in prop::collection::vec(arb_close(), 1..30)) {
        let once = normalize(&to_raw(&closes)).unwrap();
        let again_raw: Vec<RawCandle> = once
            .candles()
            .iter()
            .map(|c| RawCandle::from_close(c.datetime, c.close))
            .collect();
        let twice = normalize(&again_raw).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Sorting keeps every record exactly once.
    #[test]
    fn normalize_preserves_records(closes in prop::collection::vec(arb_close(), 1..30)) {
        let mut raw = to_raw(&closes);
        raw.reverse();
        let series = normalize(&raw).unwrap();
        prop_assert_eq!(series.len(), closes.len());
        let mut got = series.closes();
        let mut expected = closes.clone();
        got.sort_by(|a, b| a.total_cmp(b));
        expected.sort_by(|a, b| a.total_cmp(b));
        prop_assert_eq!(got, expected);
    }
}

// ── 2. Outcome shape ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn short_series_never_entered(close in prop::option::of(arb_close()), params in arb_params()) {
        let closes: Vec<f64> = close.into_iter().collect();
        let out = simulate_closes(&closes, &params).unwrap();
        prop_assert!(!out.entered);
        prop_assert_eq!(out.exit_reason, ExitReason::NotEntered);
        prop_assert_eq!(out.profit_fraction, 0.0);
        prop_assert_eq!(out.holding_duration_days, 0);
    }

    #[test]
    fn entered_outcomes_are_consistent(closes in arb_closes(), params in arb_params()) {
        let out = simulate_closes(&closes, &params).unwrap();
        if closes.len() < 2 {
            prop_assert!(!out.entered);
        } else {
            prop_assert!(out.entered);
            prop_assert_ne!(out.exit_reason, ExitReason::NotEntered);
            prop_assert!(out.profit_fraction.is_finite());
            prop_assert_eq!(out.is_win, out.profit_fraction >= 0.0);
            prop_assert!((out.holding_duration_days as usize) <= closes.len() - 2);
            let expected_filtered =
                closes[1] < closes[0] * (1.0 + params.entry_threshold_pct / 100.0);
            prop_assert_eq!(out.filtered, expected_filtered);
            if out.exit_reason == ExitReason::Holding {
                prop_assert_eq!(out.holding_duration_days as usize, closes.len() - 2);
            }
        }
    }

    /// Without a trailing rule, a wide stop always holds to the end.
    #[test]
    fn wide_stop_holds_to_end(closes in prop::collection::vec(arb_close(), 2..30)) {
        let params = SimulationParameters::new(0.0, -100.0);
        let out = simulate_closes(&closes, &params).unwrap();
        prop_assert_eq!(out.exit_reason, ExitReason::Holding);
        prop_assert_eq!(out.holding_duration_days as usize, closes.len() - 2);
    }
}

// ── 3–5. Aggregation ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn total_trades_counts_entered_unfiltered(batch in arb_batch(), params in arb_params()) {
        let result = compute_aggregate(&batch, &params);
        let counted = result
            .iter_outcomes()
            .filter(|(_, _, o)| o.entered && !o.filtered)
            .count();
        prop_assert_eq!(result.stats.total_trades, counted);

        let counted_profit: f64 = result
            .iter_outcomes()
            .filter(|(_, _, o)| o.entered && !o.filtered)
            .map(|(_, _, o)| o.profit_fraction)
            .sum();
        prop_assert!((result.stats.total_profit_fraction - counted_profit).abs() < 1e-9);

        if result.stats.total_trades == 0 {
            prop_assert!(result.derived().win_rate.is_none());
            prop_assert!(result.derived().average_profit.is_none());
        }
    }

    #[test]
    fn aggregation_is_deterministic(batch in arb_batch(), params in arb_params()) {
        let a = compute_aggregate(&batch, &params);
        let b = compute_aggregate(&batch, &params);
        prop_assert_eq!(a, b);
    }

    /// Shuffling candles inside each series leaves the result unchanged.
    #[test]
    fn aggregation_ignores_candle_order(batch in arb_batch(), params in arb_params()) {
        let reversed: ScreenBatch = batch
            .iter()
            .map(|(date, by_ticker)| {
                let by_ticker = by_ticker
                    .iter()
                    .map(|(t, raw)| {
                        let mut raw = raw.clone();
                        raw.reverse();
                        (t.clone(), raw)
                    })
                    .collect();
                (date.clone(), by_ticker)
            })
            .collect();
        prop_assert_eq!(
            compute_aggregate(&batch, &params),
            compute_aggregate(&reversed, &params)
        );
    }
}
