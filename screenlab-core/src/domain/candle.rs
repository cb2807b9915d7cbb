//! Candle — one daily price record for a ticker.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// A candle exactly as decoded from a screen-result file.
///
/// Every field is optional because the files are produced by an external
/// screener and occasionally carry partial records. Only `datetime` and
/// `close` are required for simulation; see [`RawCandle::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandle {
    #[serde(default)]
    pub datetime: Option<i64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
}

/// Which required field a raw candle was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandleField {
    Datetime,
    Close,
}

impl std::fmt::Display for CandleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandleField::Datetime => write!(f, "datetime"),
            CandleField::Close => write!(f, "close"),
        }
    }
}

impl RawCandle {
    /// Shorthand used heavily in tests and synthetic data.
    pub fn from_close(datetime: i64, close: f64) -> Self {
        Self {
            datetime: Some(datetime),
            close: Some(close),
            ..Self::default()
        }
    }

    /// Convert into a validated [`Candle`].
    ///
    /// A missing or non-finite `close` and a missing `datetime` are rejected.
    /// Absent `open`/`high`/`low` fall back to `close`.
    pub fn validate(&self) -> Result<Candle, CandleField> {
        let datetime = self.datetime.ok_or(CandleField::Datetime)?;
        let close = self
            .close
            .filter(|c| c.is_finite())
            .ok_or(CandleField::Close)?;
        Ok(Candle {
            datetime,
            open: self.open.unwrap_or(close),
            high: self.high.unwrap_or(close),
            low: self.low.unwrap_or(close),
            close,
        })
    }
}

/// Validated daily candle. `datetime` is epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// UTC calendar date for epoch seconds.
pub fn epoch_date(datetime: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(datetime, 0).map(|dt| dt.date_naive())
}
