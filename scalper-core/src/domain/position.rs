//! Tracked position and position lifecycle events.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::composer::ratchet::RatchetState;
use crate::domain::market::Quote;
use crate::domain::SymbolInfo;

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("long"),
            Side::Short => f.write_str("short"),
        }
    }
}

/// Broker-assigned position identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The single position the core is managing.
///
/// The position itself is owned by the broker; this is the core's view of it.
/// The stop level goes through a `RatchetState`, so it can only tighten.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPosition {
    pub id: PositionId,
    pub side: Side,
    pub entry_price: f64,
    pub take_profit: Option<f64>,
    pub label: String,
    stop: RatchetState,
}

impl TrackedPosition {
    pub fn new(
        id: PositionId,
        side: Side,
        entry_price: f64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
        label: impl Into<String>,
    ) -> Self {
        let stop = match stop_loss {
            Some(level) => RatchetState::with_initial_level(side, level),
            None => RatchetState::new(side),
        };
        Self {
            id,
            side,
            entry_price,
            take_profit,
            label: label.into(),
            stop,
        }
    }

    /// Current stop-loss price, if any.
    pub fn stop_loss(&self) -> Option<f64> {
        self.stop.current_level()
    }

    /// True if `proposed` is strictly tighter than the current stop.
    pub fn would_tighten_stop(&self, proposed: f64) -> bool {
        self.stop.would_tighten(proposed)
    }

    /// Record a new stop proposal. Returns the effective stop (never looser).
    pub fn ratchet_stop(&mut self, proposed: f64) -> f64 {
        self.stop.apply(proposed)
    }

    /// Unrealized profit in pips at the price the position would close at
    /// (bid for longs, ask for shorts).
    pub fn unrealized_pips(&self, quote: &Quote, symbol: &SymbolInfo) -> f64 {
        let distance = match self.side {
            Side::Long => quote.bid - self.entry_price,
            Side::Short => self.entry_price - quote.ask,
        };
        symbol.to_pips(distance)
    }
}

/// A position was filled at the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionOpened {
    pub id: PositionId,
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub label: String,
}

/// A position was closed at the broker (by stop, target, or a close request).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionClosed {
    pub id: PositionId,
    pub gross_profit: f64,
}

/// Notifications delivered by the order-management collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PositionEvent {
    Opened(PositionOpened),
    Closed(PositionClosed),
    /// A pending entry order was rejected or expired without filling.
    EntryCancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(bid: f64, ask: f64) -> Quote {
        Quote { bid, ask }
    }

    #[test]
    fn long_pips_use_bid() {
        let pos = TrackedPosition::new(PositionId(1), Side::Long, 1.1000, None, None, "scalper");
        let sym = SymbolInfo::fx_major("EURUSD");
        let pips = pos.unrealized_pips(&quote(1.1006, 1.1007), &sym);
        assert!((pips - 6.0).abs() < 1e-6);
    }

    #[test]
    fn short_pips_use_ask() {
        let pos = TrackedPosition::new(PositionId(1), Side::Short, 1.1000, None, None, "scalper");
        let sym = SymbolInfo::fx_major("EURUSD");
        let pips = pos.unrealized_pips(&quote(1.0993, 1.0994), &sym);
        assert!((pips - 6.0).abs() < 1e-6);
    }

    #[test]
    fn stop_only_tightens() {
        let mut pos = TrackedPosition::new(
            PositionId(7),
            Side::Long,
            1.1000,
            Some(1.0970),
            None,
            "scalper",
        );
        assert_eq!(pos.ratchet_stop(1.1002), 1.1002);
        assert_eq!(pos.ratchet_stop(1.0990), 1.1002);
        assert_eq!(pos.stop_loss(), Some(1.1002));
    }

    #[test]
    fn side_helpers() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.sign(), -1.0);
    }

    #[test]
    fn event_json_is_tagged() {
        let event = PositionEvent::Closed(PositionClosed {
            id: PositionId(3),
            gross_profit: -12.5,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"closed\""));
        let back: PositionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
