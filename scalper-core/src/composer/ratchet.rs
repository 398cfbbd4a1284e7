//! Stop-loss ratchet.
//!
//! **Core rule:** a stop may tighten, never loosen.
//!
//! `StopRatchet` is the configured trigger (pure, proposes a level);
//! `RatchetState` is the per-position memory that enforces the rule.

use serde::{Deserialize, Serialize};

use crate::domain::{Quote, Side, SymbolInfo, TrackedPosition};

/// Absorbs float noise in price-to-pip conversion (0.0006 / 0.0001 < 6.0).
const PIP_EPSILON: f64 = 1e-9;

/// Per-position stop memory.
///
/// - Long positions: stop can only rise
/// - Short positions: stop can only fall
#[derive(Debug, Clone, PartialEq)]
pub struct RatchetState {
    /// High-water mark for longs, low-water mark for shorts
    current_level: Option<f64>,
    side: Side,
}

impl RatchetState {
    pub fn new(side: Side) -> Self {
        Self {
            current_level: None,
            side,
        }
    }

    pub fn with_initial_level(side: Side, initial_level: f64) -> Self {
        Self {
            current_level: Some(initial_level),
            side,
        }
    }

    /// Apply a proposed stop level. Returns the effective level.
    ///
    /// # Example
    /// ```
    /// use scalper_core::composer::RatchetState;
    /// use scalper_core::domain::Side;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(Side::Long, 1.0970);
    /// assert_eq!(ratchet.apply(1.1002), 1.1002);
    /// // Loosening is blocked.
    /// assert_eq!(ratchet.apply(1.0950), 1.1002);
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        let level = match self.current_level {
            None => proposed,
            Some(current) => match self.side {
                Side::Long => current.max(proposed),
                Side::Short => current.min(proposed),
            },
        };
        self.current_level = Some(level);
        level
    }

    /// True if `proposed` would move the stop strictly tighter.
    pub fn would_tighten(&self, proposed: f64) -> bool {
        match self.current_level {
            None => true,
            Some(current) => match self.side {
                Side::Long => proposed > current,
                Side::Short => proposed < current,
            },
        }
    }

    pub fn current_level(&self) -> Option<f64> {
        self.current_level
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

/// Profit-lock trigger: once unrealized profit reaches `trigger_pips`,
/// propose a stop `lock_pips` beyond the entry price in the position's favor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopRatchet {
    pub trigger_pips: f64,
    pub lock_pips: f64,
}

impl StopRatchet {
    pub fn new(trigger_pips: f64, lock_pips: f64) -> Self {
        Self {
            trigger_pips,
            lock_pips,
        }
    }

    /// Trigger at 6 pips, lock 2 pips of profit.
    pub fn default_params() -> Self {
        Self::new(6.0, 2.0)
    }

    /// Proposed stop price, or `None` when the trigger has not been reached or
    /// the proposal would not tighten the current stop.
    pub fn propose(
        &self,
        position: &TrackedPosition,
        quote: &Quote,
        symbol: &SymbolInfo,
    ) -> Option<f64> {
        if position.unrealized_pips(quote, symbol) + PIP_EPSILON < self.trigger_pips {
            return None;
        }
        let level = position.entry_price + position.side.sign() * symbol.from_pips(self.lock_pips);
        position.would_tighten_stop(level).then_some(level)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.trigger_pips.is_finite() && self.lock_pips.is_finite()) {
            return Err("stop ratchet pips must be finite".into());
        }
        if self.lock_pips >= self.trigger_pips {
            return Err(format!(
                "lock_pips {} must be below trigger_pips {}",
                self.lock_pips, self.trigger_pips
            ));
        }
        Ok(())
    }
}
