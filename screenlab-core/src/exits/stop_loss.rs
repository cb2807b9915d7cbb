//! Stop-loss — exit when the close falls below a fixed level.
//!
//! level = buy_price * (1 + stop_fraction). The fraction is normally negative;
//! zero or positive values are accepted and simply produce a tighter stop.

use crate::domain::ExitReason;

use super::{ExitRule, ExitSignal, HeldPosition};

#[derive(Debug, Clone)]
pub struct StopLossRule {
    /// Stop relative to the buy price as a fraction (e.g., -0.05 for -5%).
    pub stop_fraction: f64,
}

impl StopLossRule {
    pub fn new(stop_fraction: f64) -> Self {
        Self { stop_fraction }
    }

    pub fn level(&self, buy_price: f64) -> f64 {
        buy_price * (1.0 + self.stop_fraction)
    }
}

impl ExitRule for StopLossRule {
    fn name(&self) -> &str {
        "stop_loss"
    }

    fn on_close(&self, position: &HeldPosition, close: f64) -> ExitSignal {
        if close < self.level(position.buy_price) {
            ExitSignal::Exit(ExitReason::StopLoss)
        } else {
            ExitSignal::Hold
        }
    }
}
