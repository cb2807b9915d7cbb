//! Trade simulator — one candle series in, one [`TradeOutcome`] out.
//!
//! Entry: buy at the close of index 1 (the first day after the signal).
//! The entry threshold only marks the outcome as `filtered`; the position is
//! simulated either way.
//!
//! Each later close is folded into the position and then handed to the exit
//! rules in priority order: stop-loss first, then the trailing stop (when
//! configured). If nothing fires, the last close ends the trade as `Holding`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ExitReason, TradeOutcome};
use crate::exits::{ExitRule, ExitSignal, HeldPosition, StopLossRule, TrailingStopRule};
use crate::normalize::{CandleSeries, SeriesError};
use crate::params::SimulationParameters;

/// Errors from simulating one series.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum SimulationError {
    #[error("invalid buy price {price}")]
    InvalidPrice { price: f64 },
    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Lifecycle of one simulated trade.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationState {
    AwaitingEntry,
    Held {
        position: HeldPosition,
        signal_price: f64,
        filtered: bool,
    },
    Exited(TradeOutcome),
}

/// Simulator configured from one parameter set.
///
/// Holds the exit rules in evaluation order. Reusable across series.
pub struct TradeSimulator {
    entry_threshold: f64,
    rules: Vec<Box<dyn ExitRule>>,
}

impl TradeSimulator {
    pub fn new(params: &SimulationParameters) -> Self {
        let mut rules: Vec<Box<dyn ExitRule>> =
            vec![Box::new(StopLossRule::new(params.stop_loss_fraction()))];
        if let (Some(take_profit), Some(distance)) = (
            params.take_profit_fraction(),
            params.trailing_distance_fraction(),
        ) {
            rules.push(Box::new(TrailingStopRule::new(take_profit, distance)));
        }
        Self {
            entry_threshold: params.entry_threshold_fraction(),
            rules,
        }
    }

    /// Names of the active exit rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn simulate(&self, series: &CandleSeries) -> Result<TradeOutcome, SimulationError> {
        self.simulate_closes(&series.closes())
    }

    /// Run the state machine over closing prices in chronological order.
    pub fn simulate_closes(&self, closes: &[f64]) -> Result<TradeOutcome, SimulationError> {
        let mut state = SimulationState::AwaitingEntry;
        for (i, &close) in closes.iter().enumerate() {
            let is_last = i + 1 == closes.len();
            state = self.step(state, closes, i, close, is_last)?;
            if let SimulationState::Exited(outcome) = state {
                return Ok(outcome);
            }
        }
        // Zero or one candle: nothing to enter against.
        Ok(TradeOutcome::not_entered())
    }

    fn step(
        &self,
        state: SimulationState,
        closes: &[f64],
        i: usize,
        close: f64,
        is_last: bool,
    ) -> Result<SimulationState, SimulationError> {
        match state {
            SimulationState::AwaitingEntry => {
                if i == 0 {
                    return Ok(SimulationState::AwaitingEntry);
                }
                let buy_price = close;
                if !buy_price.is_finite() || buy_price <= 0.0 {
                    return Err(SimulationError::InvalidPrice { price: buy_price });
                }
                let signal_price = closes[0];
                let filtered = buy_price < signal_price * (1.0 + self.entry_threshold);
                let position = HeldPosition::open(buy_price);
                if is_last {
                    // Entered on the final candle: no day left to hold.
                    return Ok(SimulationState::Exited(exit_outcome(
                        &position,
                        signal_price,
                        filtered,
                        buy_price,
                        ExitReason::Holding,
                    )));
                }
                Ok(SimulationState::Held {
                    position,
                    signal_price,
                    filtered,
                })
            }
            SimulationState::Held {
                mut position,
                signal_price,
                filtered,
            } => {
                position.mark(close);
                let reason = self
                    .rules
                    .iter()
                    .find_map(|rule| match rule.on_close(&position, close) {
                        ExitSignal::Exit(reason) => Some(reason),
                        ExitSignal::Hold => None,
                    })
                    .or(is_last.then_some(ExitReason::Holding));

                Ok(match reason {
                    Some(reason) => SimulationState::Exited(exit_outcome(
                        &position,
                        signal_price,
                        filtered,
                        close,
                        reason,
                    )),
                    None => SimulationState::Held {
                        position,
                        signal_price,
                        filtered,
                    },
                })
            }
            exited @ SimulationState::Exited(_) => Ok(exited),
        }
    }
}

fn exit_outcome(
    position: &HeldPosition,
    signal_price: f64,
    filtered: bool,
    exit_price: f64,
    reason: ExitReason,
) -> TradeOutcome {
    let profit_fraction = position.return_at(exit_price);
    TradeOutcome {
        entered: true,
        filtered,
        profit_fraction,
        holding_duration_days: position.days_held,
        exit_reason: reason,
        is_win: profit_fraction >= 0.0,
        signal_price: Some(signal_price),
        buy_price: Some(position.buy_price),
        exit_price: Some(exit_price),
        peak_price: Some(position.highest_close),
        invalid_price: None,
    }
}

/// Simulate one series with a fresh simulator.
pub fn simulate(
    series: &CandleSeries,
    params: &SimulationParameters,
) -> Result<TradeOutcome, SimulationError> {
    TradeSimulator::new(params).simulate(series)
}

/// Simulate a bare close sequence (assumed chronological).
pub fn simulate_closes(
    closes: &[f64],
    params: &SimulationParameters,
) -> Result<TradeOutcome, SimulationError> {
    TradeSimulator::new(params).simulate_closes(closes)
}
