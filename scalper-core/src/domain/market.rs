//! Per-cycle market input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Side;
use super::series::SeriesSnapshot;

/// Top-of-book quote for the traded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: f64,
    pub ask: f64,
}

impl Quote {
    pub fn new(bid: f64, ask: f64) -> Self {
        Self { bid, ask }
    }

    /// Price a market order on `side` would fill at (ask to buy, bid to sell).
    pub fn entry_price(&self, side: Side) -> f64 {
        match side {
            Side::Long => self.ask,
            Side::Short => self.bid,
        }
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Everything one decision cycle reads, materialized before the cycle starts.
#[derive(Debug, Clone)]
pub struct MarketState {
    pub time: DateTime<Utc>,
    /// Account balance as of the start of the cycle.
    pub balance: f64,
    pub quote: Quote,
    /// Completed bars of the working timeframe.
    pub local: SeriesSnapshot,
    /// Completed bars of the reference timeframe.
    pub reference: SeriesSnapshot,
}
