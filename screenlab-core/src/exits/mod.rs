//! Exit rules — decide, one close at a time, whether a held position closes.
//!
//! Rules are stateless: everything they need is on [`HeldPosition`], which
//! the simulator marks with each new close before asking the rules. Rules are
//! evaluated in priority order and the first exit wins.
//!
//! ## Concrete implementations
//!
//! - [`StopLossRule`] — close below a fixed level relative to the buy price
//! - [`TrailingStopRule`] — close below the running peak once take-profit was reached

pub mod stop_loss;
pub mod trailing_stop;

pub use stop_loss::StopLossRule;
pub use trailing_stop::TrailingStopRule;

use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;

/// A position opened at the close of the day after the signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeldPosition {
    pub buy_price: f64,
    /// Highest close since entry, the entry close included.
    pub highest_close: f64,
    /// Highest close after the entry day; `None` until the first mark.
    pub highest_close_after_entry: Option<f64>,
    pub days_held: u32,
}

impl HeldPosition {
    pub fn open(buy_price: f64) -> Self {
        Self {
            buy_price,
            highest_close: buy_price,
            highest_close_after_entry: None,
            days_held: 0,
        }
    }

    /// Advance one day and fold `close` into the running peaks.
    pub fn mark(&mut self, close: f64) {
        self.days_held += 1;
        self.highest_close = self.highest_close.max(close);
        self.highest_close_after_entry = Some(match self.highest_close_after_entry {
            Some(h) => h.max(close),
            None => close,
        });
    }

    /// Return relative to the buy price for a given close.
    pub fn return_at(&self, close: f64) -> f64 {
        (close - self.buy_price) / self.buy_price
    }
}

/// What an exit rule wants to do on the current close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    Hold,
    Exit(ExitReason),
}

/// Trait for exit rules.
///
/// `close` has already been folded into `position` via [`HeldPosition::mark`].
pub trait ExitRule: Send + Sync {
    /// Human-readable name (e.g., "stop_loss").
    fn name(&self) -> &str;

    fn on_close(&self, position: &HeldPosition, close: f64) -> ExitSignal;
}
