//! Simulation parameters as the user supplies them (percent units).
//!
//! The simulator reads these through the fraction accessors, so `-2.5` here
//! means a stop 2.5% below the buy price.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("parameter '{field}' must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
}

/// Entry and exit parameters for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Minimum rise of the day-after close over the signal close, in percent.
    pub entry_threshold_pct: f64,
    /// Stop-loss relative to the buy price, in percent. Normally `<= 0`.
    pub stop_loss_pct: f64,
    /// Trailing distance below the running peak, in percent. Normally `<= 0`.
    pub trailing_stop_pct: Option<f64>,
    /// Gain over the buy price that arms the trailing stop, in percent.
    pub take_profit_pct: Option<f64>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            entry_threshold_pct: 0.0,
            stop_loss_pct: -5.0,
            trailing_stop_pct: None,
            take_profit_pct: None,
        }
    }
}

impl SimulationParameters {
    pub fn new(entry_threshold_pct: f64, stop_loss_pct: f64) -> Self {
        Self {
            entry_threshold_pct,
            stop_loss_pct,
            trailing_stop_pct: None,
            take_profit_pct: None,
        }
    }

    /// Enable the take-profit / trailing-stop rule.
    pub fn with_trailing(mut self, take_profit_pct: f64, trailing_stop_pct: f64) -> Self {
        self.take_profit_pct = Some(take_profit_pct);
        self.trailing_stop_pct = Some(trailing_stop_pct);
        self
    }

    pub fn entry_threshold_fraction(&self) -> f64 {
        self.entry_threshold_pct / 100.0
    }

    pub fn stop_loss_fraction(&self) -> f64 {
        self.stop_loss_pct / 100.0
    }

    pub fn take_profit_fraction(&self) -> Option<f64> {
        self.take_profit_pct.map(|p| p / 100.0)
    }

    /// Distance below the peak as a positive fraction.
    ///
    /// Accepts either sign: `-3.0` and `3.0` both mean "3% below the peak".
    pub fn trailing_distance_fraction(&self) -> Option<f64> {
        self.trailing_stop_pct.map(|p| p.abs() / 100.0)
    }

    /// The trailing rule needs both a take-profit trigger and a distance.
    pub fn trailing_enabled(&self) -> bool {
        self.take_profit_pct.is_some() && self.trailing_stop_pct.is_some()
    }

    /// Exactly one of take-profit and trailing distance is set, which leaves
    /// the trailing rule off.
    pub fn trailing_half_configured(&self) -> bool {
        self.take_profit_pct.is_some() != self.trailing_stop_pct.is_some()
    }

    /// Reject NaN and infinite values. Any finite value is accepted.
    pub fn validate(&self) -> Result<(), ParamsError> {
        check_finite("entry_threshold_pct", self.entry_threshold_pct)?;
        check_finite("stop_loss_pct", self.stop_loss_pct)?;
        if let Some(v) = self.trailing_stop_pct {
            check_finite("trailing_stop_pct", v)?;
        }
        if let Some(v) = self.take_profit_pct {
            check_finite("take_profit_pct", v)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for SimulationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "entry >= {:.2}%, stop-loss {:.2}%",
            self.entry_threshold_pct, self.stop_loss_pct
        )?;
        if let (Some(tp), Some(ts)) = (self.take_profit_pct, self.trailing_stop_pct) {
            write!(f, ", trailing {:.2}% after +{:.2}%", ts.abs(), tp)?;
        }
        Ok(())
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ParamsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParamsError::NonFinite { field, value })
    }
}
