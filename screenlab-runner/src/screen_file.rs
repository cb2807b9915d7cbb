//! Screen-result files — naming, decoding, and episode selection.
//!
//! One file per signal date: `screen_results_YYYY-MM-DD.json`, optionally
//! gzip-compressed as `screen_results_YYYY-MM-DD.json.gz`. The content is a
//! JSON object keyed by ticker:
//!
//! ```json
//! {
//!   "AAPL": {
//!     "price_data": { "candles": [{"datetime": 1704153600, "close": 185.6}], "score": 0.82 },
//!     "filtered_candles": [ ... ]
//!   }
//! }
//! ```
//!
//! `price_data.candles` carries chart history from before the signal as well,
//! so the simulation episode starts at the signal date. When the screener
//! already wrote `filtered_candles`, those are the episode.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use screenlab_core::domain::{epoch_date, RawCandle};
use serde::{Deserialize, Serialize};

pub const FILE_PREFIX: &str = "screen_results_";
pub const JSON_SUFFIX: &str = ".json";
pub const GZIP_SUFFIX: &str = ".json.gz";

/// A screen-result file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenFile {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub compressed: bool,
}

impl ScreenFile {
    /// Recognize a screen-result file by name. Returns `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (date, compressed) = parse_file_name(name)?;
        Some(Self {
            date,
            path: path.to_path_buf(),
            compressed,
        })
    }

    /// ISO date key used in the batch.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Parse `screen_results_YYYY-MM-DD.json[.gz]` into (date, compressed).
pub fn parse_file_name(name: &str) -> Option<(NaiveDate, bool)> {
    let rest = name.strip_prefix(FILE_PREFIX)?;
    let (date_part, compressed) = if let Some(d) = rest.strip_suffix(GZIP_SUFFIX) {
        (d, true)
    } else {
        (rest.strip_suffix(JSON_SUFFIX)?, false)
    };
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((date, compressed))
}

/// File name for a signal date.
pub fn file_name_for(date: NaiveDate, compressed: bool) -> String {
    let suffix = if compressed { GZIP_SUFFIX } else { JSON_SUFFIX };
    format!("{FILE_PREFIX}{}{suffix}", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    #[serde(default)]
    pub candles: Vec<RawCandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// One ticker's entry in a screen-result file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_data: Option<PriceData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtered_candles: Option<Vec<RawCandle>>,
}

impl TickerEntry {
    pub fn score(&self) -> Option<f64> {
        self.price_data.as_ref().and_then(|p| p.score)
    }

    /// Candles from the signal date onward.
    ///
    /// Records without a usable timestamp are kept so that normalization can
    /// report them instead of silently dropping them.
    pub fn episode_candles(&self, signal_date: NaiveDate) -> Vec<RawCandle> {
        if let Some(filtered) = &self.filtered_candles {
            return filtered.clone();
        }
        let Some(price_data) = &self.price_data else {
            return Vec::new();
        };
        price_data
            .candles
            .iter()
            .filter(|raw| match raw.datetime {
                Some(ts) => epoch_date(ts).map_or(true, |d| d >= signal_date),
                None => true,
            })
            .cloned()
            .collect()
    }
}

/// Decoded file content. `null` entries are tickers the screener listed
/// without data.
pub type ScreenResult = BTreeMap<String, Option<TickerEntry>>;

/// Decode file bytes, gunzipping first when `compressed`.
pub fn decode(bytes: &[u8], compressed: bool) -> Result<ScreenResult, DecodeError> {
    if compressed {
        let mut json = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Errors decoding one file's bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("gzip: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turn a decoded file into per-ticker episode candles for one signal date.
pub fn episodes(result: &ScreenResult, signal_date: NaiveDate) -> BTreeMap<String, Vec<RawCandle>> {
    result
        .iter()
        .map(|(ticker, entry)| {
            let candles = entry
                .as_ref()
                .map(|e| e.episode_candles(signal_date))
                .unwrap_or_default();
            (ticker.clone(), candles)
        })
        .collect()
}
