//! Synthetic screen results for demos, tests, and benchmarks.
//!
//! Prices follow a seeded random walk, so the same [`SyntheticSpec`] always
//! produces byte-identical files.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveTime};
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use screenlab_core::{RawCandle, ScreenBatch};

use crate::screen_file::{episodes, file_name_for, PriceData, ScreenResult, TickerEntry};

const DAY_SECS: i64 = 86_400;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpec {
    /// First signal date.
    pub start: NaiveDate,
    /// Number of consecutive signal dates (one file each).
    pub signal_days: u32,
    /// Tickers per file.
    pub tickers: usize,
    /// Chart-context candles before the signal date.
    pub history_days: u32,
    /// Candles after the signal date.
    pub forward_days: u32,
    pub seed: u64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default(),
            signal_days: 5,
            tickers: 20,
            history_days: 10,
            forward_days: 20,
            seed: 42,
        }
    }
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn random_walk(rng: &mut StdRng, first_ts: i64, len: u32) -> Vec<RawCandle> {
    let mut price: f64 = rng.gen_range(5.0..500.0);
    (0..len)
        .map(|i| {
            let open = price;
            price *= 1.0 + rng.gen_range(-0.04..0.045);
            let (lo, hi) = if open < price { (open, price) } else { (price, open) };
            RawCandle {
                datetime: Some(first_ts + i64::from(i) * DAY_SECS),
                open: Some(open),
                high: Some(hi * (1.0 + rng.gen_range(0.0..0.01))),
                low: Some(lo * (1.0 - rng.gen_range(0.0..0.01))),
                close: Some(price),
            }
        })
        .collect()
}

/// Generate decoded file contents keyed by signal date.
pub fn generate_results(spec: &SyntheticSpec) -> BTreeMap<NaiveDate, ScreenResult> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut out = BTreeMap::new();

    for d in 0..spec.signal_days {
        let date = spec.start + Duration::days(i64::from(d));
        let first = midnight_utc(date) - i64::from(spec.history_days) * DAY_SECS;
        let len = spec.history_days + 1 + spec.forward_days;

        let result: ScreenResult = (0..spec.tickers)
            .map(|t| {
                let entry = TickerEntry {
                    price_data: Some(PriceData {
                        candles: random_walk(&mut rng, first, len),
                        score: Some(rng.gen_range(0.0..1.0)),
                    }),
                    filtered_candles: None,
                };
                (format!("SYN{t:03}"), Some(entry))
            })
            .collect();
        out.insert(date, result);
    }
    out
}

/// Generate a batch ready for aggregation, skipping the file round trip.
pub fn generate_batch(spec: &SyntheticSpec) -> ScreenBatch {
    generate_results(spec)
        .into_iter()
        .map(|(date, result)| {
            let key = date.format("%Y-%m-%d").to_string();
            (key, episodes(&result, date))
        })
        .collect()
}

/// Write one `screen_results_*.json[.gz]` file per signal date into `dir`.
pub fn write_screen_files(
    dir: &Path,
    spec: &SyntheticSpec,
    compressed: bool,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut paths = Vec::new();
    for (date, result) in generate_results(spec) {
        let path = dir.join(file_name_for(date, compressed));
        let json = serde_json::to_vec(&result).context("failed to serialize screen result")?;
        let bytes = if compressed {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(&json)?;
            enc.finish()?
        } else {
            json
        };
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        paths.push(path);
    }
    tracing::info!(dir = %dir.display(), files = paths.len(), "wrote synthetic screen files");
    Ok(paths)
}
