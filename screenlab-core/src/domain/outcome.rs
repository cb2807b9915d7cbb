//! TradeOutcome — the result of simulating one signal for one ticker.

use serde::{Deserialize, Serialize};

/// Why a simulated position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// Close fell below the stop-loss level relative to the buy price.
    StopLoss,
    /// Close fell below the trailing level after take-profit was reached.
    TrailingStop,
    /// Data ran out without any other rule firing.
    Holding,
    /// No position was opened (fewer than two candles).
    NotEntered,
}

impl ExitReason {
    pub fn name(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::Holding => "holding",
            ExitReason::NotEntered => "not_entered",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one simulation call.
///
/// `profit_fraction` is a plain fraction (`-0.05` is a 5% loss). Formatting
/// into percentages belongs to whoever displays the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub entered: bool,
    /// Entry threshold was missed. Simulated anyway, excluded from statistics.
    pub filtered: bool,
    pub profit_fraction: f64,
    /// Days held after the entry candle.
    pub holding_duration_days: u32,
    pub exit_reason: ExitReason,
    pub is_win: bool,

    // ── Diagnostics ──
    pub signal_price: Option<f64>,
    pub buy_price: Option<f64>,
    pub exit_price: Option<f64>,
    /// Highest close seen between entry and exit.
    pub peak_price: Option<f64>,
    /// Set when the buy price was zero, negative or non-finite. Such an
    /// outcome is never entered and never counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_price: Option<f64>,
}

impl TradeOutcome {
    /// Outcome for a series that never produced a position.
    pub fn not_entered() -> Self {
        Self {
            entered: false,
            filtered: false,
            profit_fraction: 0.0,
            holding_duration_days: 0,
            exit_reason: ExitReason::NotEntered,
            is_win: false,
            signal_price: None,
            buy_price: None,
            exit_price: None,
            peak_price: None,
            invalid_price: None,
        }
    }

    /// Flagged outcome for a series whose buy price cannot be divided by.
    pub fn invalid(buy_price: f64) -> Self {
        Self {
            invalid_price: Some(buy_price),
            ..Self::not_entered()
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid_price.is_some()
    }

    /// Whether this outcome contributes to aggregate statistics.
    pub fn is_counted(&self) -> bool {
        self.entered && !self.filtered
    }
}
