//! Domain types for ScreenLab

pub mod candle;
pub mod outcome;

pub use candle::{epoch_date, Candle, CandleField, RawCandle};
pub use outcome::{ExitReason, TradeOutcome};

/// Ticker symbol, e.g. "AAPL".
pub type Ticker = String;

/// ISO-8601 signal date ("YYYY-MM-DD") as it appears in file names.
pub type SignalDate = String;
