//! Candle series normalization: validate, then sort chronologically.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Candle, CandleField, RawCandle};

/// Errors for a single ticker's candle series.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum SeriesError {
    #[error("series has no candles")]
    EmptySeries,
    #[error("candle {index} is missing a valid '{field}'")]
    MalformedCandle { index: usize, field: CandleField },
}

/// Candles for one ticker/signal episode, ascending by `datetime`.
///
/// Only constructed through [`normalize`] or [`sort_candles`], so the
/// ordering and non-emptiness hold for every instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Closing prices in chronological order.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// The signal-day candle.
    pub fn first(&self) -> &Candle {
        &self.candles[0]
    }

    pub fn last(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }
}

/// Validate raw records and sort them ascending by `datetime`.
///
/// The first invalid record (in input order) fails the whole series; the
/// caller decides whether to skip it.
pub fn normalize(raw: &[RawCandle]) -> Result<CandleSeries, SeriesError> {
    let candles = raw
        .iter()
        .enumerate()
        .map(|(index, r)| {
            r.validate()
                .map_err(|field| SeriesError::MalformedCandle { index, field })
        })
        .collect::<Result<Vec<_>, _>>()?;
    sort_candles(candles)
}

/// Sort already-validated candles. Stable, so equal timestamps keep input order.
pub fn sort_candles(mut candles: Vec<Candle>) -> Result<CandleSeries, SeriesError> {
    if candles.is_empty() {
        return Err(SeriesError::EmptySeries);
    }
    if !is_sorted(&candles) {
        candles.sort_by_key(|c| c.datetime);
    }
    Ok(CandleSeries { candles })
}

/// True if `candles` is non-decreasing in `datetime`.
pub fn is_sorted(candles: &[Candle]) -> bool {
    candles.windows(2).all(|w| w[0].datetime <= w[1].datetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    #[test]
    fn sorts_unordered_records() {
        let raw = vec![
            RawCandle::from_close(3 * DAY, 103.0),
            RawCandle::from_close(DAY, 101.0),
            RawCandle::from_close(2 * DAY, 102.0),
        ];
        let series = normalize(&raw).unwrap();
        assert_eq!(series.closes(), vec![101.0, 102.0, 103.0]);
        assert!(is_sorted(series.candles()));
    }

    #[test]
    fn sorted_candles_pass_through() {
        let raw = vec![
            RawCandle::from_close(DAY, 101.0),
            RawCandle::from_close(DAY, 100.0),
            RawCandle::from_close(2 * DAY, 102.0),
        ];
        let candles: Vec<Candle> = raw.iter().map(|r| r.validate().unwrap()).collect();
        assert!(is_sorted(&candles));
        let series = sort_candles(candles.clone()).unwrap();
        assert_eq!(series.candles(), candles.as_slice());
    }

    #[test]
    fn empty_input_is_empty_series() {
        assert_eq!(normalize(&[]), Err(SeriesError::EmptySeries));
    }

    #[test]
    fn malformed_record_reports_index_and_field() {
        let raw = vec![
            RawCandle::from_close(DAY, 101.0),
            RawCandle {
                datetime: Some(2 * DAY),
                ..RawCandle::default()
            },
        ];
        assert_eq!(
            normalize(&raw),
            Err(SeriesError::MalformedCandle {
                index: 1,
                field: CandleField::Close
            })
        );
    }

    #[test]
    fn keeps_duplicate_timestamps() {
        let raw = vec![
            RawCandle::from_close(DAY, 1.0),
            RawCandle::from_close(DAY, 2.0),
        ];
        let series = normalize(&raw).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![1.0, 2.0]);
    }

    #[test]
    fn first_and_last() {
        let raw = vec![
            RawCandle::from_close(2 * DAY, 20.0),
            RawCandle::from_close(DAY, 10.0),
        ];
        let series = normalize(&raw).unwrap();
        assert_eq!(series.first().close, 10.0);
        assert_eq!(series.last().close, 20.0);
    }
}
