//! Outcome aggregation — simulate a whole batch and fold the outcomes.
//!
//! [`compute_aggregate`] is a pure function of (batch, parameters). It builds
//! every outcome first and then folds the counted ones into a fresh
//! [`AggregateStats`]; nothing is carried over between calls, so repeated or
//! overlapping recomputations can never double-count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, RawCandle, SignalDate, Ticker, TradeOutcome};
use crate::normalize::{normalize, SeriesError};
use crate::params::SimulationParameters;
use crate::simulator::{SimulationError, TradeSimulator};

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Raw candles keyed by signal date, then ticker.
pub type ScreenBatch = BTreeMap<SignalDate, BTreeMap<Ticker, Vec<RawCandle>>>;

/// Outcomes keyed the same way as the batch they came from.
pub type OutcomeMap = BTreeMap<SignalDate, BTreeMap<Ticker, TradeOutcome>>;

/// Running sums over counted outcomes (entered and not filtered).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_trades: usize,
    pub total_wins: usize,
    pub total_losses: usize,
    pub total_profit_fraction: f64,
    pub total_duration_days: u64,

    // ── Per exit reason (counted trades only) ──
    pub stop_loss_exits: usize,
    pub trailing_stop_exits: usize,
    pub holding_exits: usize,

    // ── Excluded from the sums ──
    pub filtered_count: usize,
    pub not_entered_count: usize,
    pub invalid_count: usize,
}

/// Rates derived from [`AggregateStats`]. `None` means undefined (no trades).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub win_rate: Option<f64>,
    pub average_profit: Option<f64>,
    pub average_duration: Option<f64>,
    pub annualized_return: Option<f64>,
}

impl AggregateStats {
    /// Fold a sequence of outcomes.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a TradeOutcome>) -> Self {
        outcomes
            .into_iter()
            .fold(Self::default(), |mut acc, outcome| {
                acc.record(outcome);
                acc
            })
    }

    fn record(&mut self, outcome: &TradeOutcome) {
        if outcome.is_invalid() {
            self.invalid_count += 1;
            return;
        }
        if !outcome.entered {
            self.not_entered_count += 1;
            return;
        }
        if outcome.filtered {
            self.filtered_count += 1;
            return;
        }
        self.total_trades += 1;
        if outcome.is_win {
            self.total_wins += 1;
        } else {
            self.total_losses += 1;
        }
        self.total_profit_fraction += outcome.profit_fraction;
        self.total_duration_days += u64::from(outcome.holding_duration_days);
        match outcome.exit_reason {
            ExitReason::StopLoss => self.stop_loss_exits += 1,
            ExitReason::TrailingStop => self.trailing_stop_exits += 1,
            ExitReason::Holding => self.holding_exits += 1,
            ExitReason::NotEntered => {}
        }
    }

    /// Combine two partial folds. Associative and commutative up to float rounding.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            total_trades: self.total_trades + other.total_trades,
            total_wins: self.total_wins + other.total_wins,
            total_losses: self.total_losses + other.total_losses,
            total_profit_fraction: self.total_profit_fraction + other.total_profit_fraction,
            total_duration_days: self.total_duration_days + other.total_duration_days,
            stop_loss_exits: self.stop_loss_exits + other.stop_loss_exits,
            trailing_stop_exits: self.trailing_stop_exits + other.trailing_stop_exits,
            holding_exits: self.holding_exits + other.holding_exits,
            filtered_count: self.filtered_count + other.filtered_count,
            not_entered_count: self.not_entered_count + other.not_entered_count,
            invalid_count: self.invalid_count + other.invalid_count,
        }
    }

    fn per_trade(&self, total: f64) -> Option<f64> {
        if self.total_trades == 0 {
            return None;
        }
        Some(total / self.total_trades as f64)
    }

    pub fn win_rate(&self) -> Option<f64> {
        self.per_trade(self.total_wins as f64)
    }

    pub fn average_profit(&self) -> Option<f64> {
        self.per_trade(self.total_profit_fraction)
    }

    pub fn average_duration(&self) -> Option<f64> {
        self.per_trade(self.total_duration_days as f64)
    }

    /// Average trade return compounded over a 252-day year.
    ///
    /// Undefined with no trades, a zero average duration, or an average loss
    /// of 100% or more.
    pub fn annualized_return(&self) -> Option<f64> {
        let avg_profit = self.average_profit()?;
        let avg_duration = self.average_duration()?;
        let growth = 1.0 + avg_profit;
        if avg_duration <= 0.0 || growth <= 0.0 {
            return None;
        }
        let annualized = growth.powf(TRADING_DAYS_PER_YEAR / avg_duration) - 1.0;
        annualized.is_finite().then_some(annualized)
    }

    pub fn derived(&self) -> DerivedStats {
        DerivedStats {
            win_rate: self.win_rate(),
            average_profit: self.average_profit(),
            average_duration: self.average_duration(),
            annualized_return: self.annualized_return(),
        }
    }
}

/// A series that could not be simulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesFailure {
    pub date: SignalDate,
    pub ticker: Ticker,
    pub error: SimulationError,
}

/// Everything one aggregation pass produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub stats: AggregateStats,
    pub outcomes: OutcomeMap,
    pub failures: Vec<SeriesFailure>,
}

impl BatchResult {
    pub fn derived(&self) -> DerivedStats {
        self.stats.derived()
    }

    pub fn outcome(&self, date: &str, ticker: &str) -> Option<&TradeOutcome> {
        self.outcomes.get(date)?.get(ticker)
    }

    /// Iterate outcomes as (date, ticker, outcome) in key order.
    pub fn iter_outcomes(&self) -> impl Iterator<Item = (&str, &str, &TradeOutcome)> {
        self.outcomes.iter().flat_map(|(date, by_ticker)| {
            by_ticker
                .iter()
                .map(move |(ticker, outcome)| (date.as_str(), ticker.as_str(), outcome))
        })
    }
}

/// Normalize and simulate one raw series.
///
/// An empty series is an expected data condition and yields `NotEntered`.
pub fn evaluate_series(
    simulator: &TradeSimulator,
    raw: &[RawCandle],
) -> Result<TradeOutcome, SimulationError> {
    match normalize(raw) {
        Ok(series) => simulator.simulate(&series),
        Err(SeriesError::EmptySeries) => Ok(TradeOutcome::not_entered()),
        Err(e) => Err(e.into()),
    }
}

/// Simulate every (date, ticker) series in `batch` and aggregate the results.
///
/// Failures are isolated per series: they are logged, listed in `failures`,
/// counted in `invalid_count`, and excluded from the sums. A series with an
/// invalid buy price also keeps a flagged outcome in `outcomes`; a malformed
/// one has no outcome.
pub fn compute_aggregate(batch: &ScreenBatch, params: &SimulationParameters) -> BatchResult {
    let simulator = TradeSimulator::new(params);
    let mut outcomes = OutcomeMap::new();
    let mut failures = Vec::new();

    for (date, by_ticker) in batch {
        for (ticker, raw) in by_ticker {
            let outcome = match evaluate_series(&simulator, raw) {
                Ok(outcome) => Some(outcome),
                Err(error) => {
                    tracing::warn!(%date, %ticker, %error, "skipping series");
                    let flagged = match error {
                        SimulationError::InvalidPrice { price } => {
                            Some(TradeOutcome::invalid(price))
                        }
                        SimulationError::Series(_) => None,
                    };
                    failures.push(SeriesFailure {
                        date: date.clone(),
                        ticker: ticker.clone(),
                        error,
                    });
                    flagged
                }
            };
            if let Some(outcome) = outcome {
                outcomes
                    .entry(date.clone())
                    .or_default()
                    .insert(ticker.clone(), outcome);
            }
        }
    }

    let mut stats = AggregateStats::from_outcomes(outcomes.values().flat_map(|m| m.values()));
    // Malformed series have no outcome to fold.
    stats.invalid_count = failures.len();

    tracing::debug!(
        trades = stats.total_trades,
        wins = stats.total_wins,
        filtered = stats.filtered_count,
        failures = stats.invalid_count,
        "batch aggregated"
    );

    BatchResult {
        stats,
        outcomes,
        failures,
    }
}
