//! Signal Composer: timing codes + indicator readings → directional decision.
//!
//! An entry needs all of:
//! 1. **Timing gate**: the cycle's timing code is in the side's permitted set
//! 2. **Volatility gate** (optional): ATR is not below the minimum
//! 3. **Trigger**: the configured [`EntryRule`] fires for that side
//!
//! Any failing stage yields `Signal::None`; there are no partial signals.
//! The composer holds no state. Tracking positions is the driver's job.

pub mod entry;
pub mod exit;
pub mod gate;
pub mod ratchet;

pub use entry::EntryRule;
pub use exit::ExitRule;
pub use gate::{TimingGate, VolatilityGate};
pub use ratchet::{RatchetState, StopRatchet};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::domain::{MarketState, Side, SymbolInfo, TrackedPosition};
use crate::error::CoreError;
use crate::timing::Timing;

/// Per-cycle decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    OpenLong,
    OpenShort,
    Close,
    #[default]
    None,
}

impl Signal {
    pub fn open(side: Side) -> Self {
        match side {
            Side::Long => Signal::OpenLong,
            Side::Short => Signal::OpenShort,
        }
    }

    /// Side of an open signal.
    pub fn entry_side(self) -> Option<Side> {
        match self {
            Signal::OpenLong => Some(Side::Long),
            Signal::OpenShort => Some(Side::Short),
            Signal::Close | Signal::None => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::OpenLong => "open_long",
            Signal::OpenShort => "open_short",
            Signal::Close => "close",
            Signal::None => "none",
        };
        f.write_str(s)
    }
}

/// What to do with the tracked position this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExitDecision {
    /// `Close` or `None`.
    pub signal: Signal,
    /// New absolute stop price, strictly tighter than the current one.
    pub ratchet_stop: Option<f64>,
}

/// Composes entry and exit decisions from one strategy's rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct Composer {
    gate: TimingGate,
    volatility: Option<VolatilityGate>,
    entry: EntryRule,
    exit: ExitRule,
    ratchet: Option<StopRatchet>,
}

impl Composer {
    pub fn new(gate: TimingGate, entry: EntryRule) -> Self {
        Self {
            gate,
            volatility: None,
            entry,
            exit: ExitRule::None,
            ratchet: None,
        }
    }

    pub fn with_volatility(mut self, gate: Option<VolatilityGate>) -> Self {
        self.volatility = gate;
        self
    }

    pub fn with_exit(mut self, exit: ExitRule) -> Self {
        self.exit = exit;
        self
    }

    pub fn with_ratchet(mut self, ratchet: Option<StopRatchet>) -> Self {
        self.ratchet = ratchet;
        self
    }

    pub fn entry_rule(&self) -> &EntryRule {
        &self.entry
    }

    /// Entry decision. Only meaningful when no position is tracked.
    pub fn compose_entry(&self, timing: &Timing, market: &MarketState) -> Result<Signal, CoreError> {
        let long_gate = self.gate.permits(Side::Long, timing);
        let short_gate = self.gate.permits(Side::Short, timing);
        if !long_gate && !short_gate {
            debug!(timing = %timing, "timing gate closed");
            return Ok(Signal::None);
        }

        if let Some(volatility) = &self.volatility {
            if !volatility.passes(&market.local)? {
                debug!(min_atr = volatility.min_atr, "volatility gate closed");
                return Ok(Signal::None);
            }
        }

        let long = long_gate && self.entry.triggers(Side::Long, &market.local)?;
        let short = short_gate && self.entry.triggers(Side::Short, &market.local)?;

        Ok(match (long, short) {
            (true, false) => Signal::OpenLong,
            (false, true) => Signal::OpenShort,
            (true, true) => {
                debug!(rule = self.entry.name(), "both sides triggered; no entry");
                Signal::None
            }
            (false, false) => Signal::None,
        })
    }

    /// Exit decision for the tracked position.
    ///
    /// A close takes precedence; the ratchet is only consulted when the
    /// position stays open. `timing` does not gate exits.
    pub fn compose_exit(
        &self,
        position: &TrackedPosition,
        timing: &Timing,
        market: &MarketState,
        symbol: &SymbolInfo,
    ) -> Result<ExitDecision, CoreError> {
        if self.exit.should_close(position.side, &market.local)? {
            debug!(
                position = %position.id,
                rule = self.exit.name(),
                timing = %timing,
                "exit rule fired"
            );
            return Ok(ExitDecision {
                signal: Signal::Close,
                ratchet_stop: None,
            });
        }

        let ratchet_stop = self
            .ratchet
            .as_ref()
            .and_then(|r| r.propose(position, &market.quote, symbol));

        Ok(ExitDecision {
            signal: Signal::None,
            ratchet_stop,
        })
    }
}
