//! Scalper Core: the strategy decision core for multi-timeframe FX scalping.
//!
//! This crate contains:
//! - Domain types (series snapshots, quotes, symbols, positions, lifecycle events)
//! - Trend-timing classifier (8-valued code per timeframe)
//! - Signal composer (timing gate, volatility gate, entry/exit rules, stop ratchet)
//! - Adaptive risk sizer with loss-streak memory
//! - Strategy configuration, presets and fingerprinting
//! - The decision-cycle driver tying them together
//!
//! Indicator math, order execution and data feeds are external: callers hand
//! in precomputed series and forward order-management notifications.

pub mod composer;
pub mod config;
pub mod domain;
pub mod driver;
pub mod error;
pub mod sizing;
pub mod timing;

pub use composer::{Composer, Signal};
pub use config::{EntryKind, StopDistance, StrategyConfig, StrategyPreset};
pub use driver::{DecisionCore, DecisionOutcome, EntryOrder};
pub use error::{ConfigError, CoreError};
pub use sizing::{LossStreak, SizingPolicy};
pub use timing::{Timing, TimingCode};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: public value types are Send + Sync, so a host can
    /// run the core on a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::MarketState>();
        require_sync::<domain::MarketState>();
        require_send::<domain::SeriesSnapshot>();
        require_sync::<domain::SeriesSnapshot>();
        require_send::<domain::PositionEvent>();
        require_sync::<domain::PositionEvent>();
        require_send::<StrategyConfig>();
        require_sync::<StrategyConfig>();
        require_send::<DecisionCore>();
        require_sync::<DecisionCore>();
        require_send::<DecisionOutcome>();
        require_sync::<DecisionOutcome>();
        require_send::<CoreError>();
        require_sync::<CoreError>();
        require_send::<ConfigError>();
        require_sync::<ConfigError>();
    }

    /// The classifier is reachable without a driver.
    #[test]
    fn classifier_is_standalone() {
        assert_eq!(timing::classify(true, 0.0002, 0.0001).value(), 1);
    }
}
