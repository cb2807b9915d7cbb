//! ScreenLab Core — candle normalization, trade-outcome simulation, aggregation.
//!
//! This crate is pure computation over data already in memory:
//! - Domain types (raw and validated candles, trade outcomes)
//! - Candle series normalizer (validate + chronological sort)
//! - Trade simulator: enter at the close after the signal, exit on
//!   stop-loss, trailing stop after take-profit, or end of data
//! - Outcome aggregator folding a whole batch into summary statistics
//!
//! No file access, no network, no rendering. The runner crate owns I/O.

pub mod aggregate;
pub mod domain;
pub mod exits;
pub mod normalize;
pub mod params;
pub mod simulator;

pub use aggregate::{
    compute_aggregate, evaluate_series, AggregateStats, BatchResult, DerivedStats, OutcomeMap,
    ScreenBatch, SeriesFailure,
};
pub use domain::{Candle, ExitReason, RawCandle, TradeOutcome};
pub use normalize::{normalize, CandleSeries, SeriesError};
pub use params::{ParamsError, SimulationParameters};
pub use simulator::{simulate, simulate_closes, SimulationError, TradeSimulator};
