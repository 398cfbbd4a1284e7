//! Decision Cycle Driver: classifier → composer → sizer, once per cycle.
//!
//! The driver owns the only state carried between cycles: the tracked
//! position, the pending entry order and the loss streak. Lifecycle events
//! from order management arrive through [`DecisionCore::on_event`] between
//! cycles; nothing here blocks or runs concurrently.

use chrono::{DateTime, Days, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::composer::{Composer, Signal};
use crate::config::{EntryKind, StrategyConfig};
use crate::domain::{
    MarketState, PositionClosed, PositionEvent, PositionId, PositionOpened, SeriesKey, SeriesView,
    Side, SymbolInfo, TrackedPosition,
};
use crate::error::{ConfigError, CoreError};
use crate::sizing::{LossStreak, SizingRequest};
use crate::timing::{market_timing, Timing};

// ─── Outcome types ──────────────────────────────────────────────────

/// Entry order to hand to order execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryOrder {
    pub side: Side,
    pub kind: EntryKind,
    /// Expected fill price (market) or trigger price (stop order).
    pub price: f64,
    /// Stop orders only.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of one decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionOutcome {
    pub signal: Signal,
    pub timing: Option<Timing>,
    pub volume: Option<f64>,
    pub entry: Option<EntryOrder>,
    pub stop_loss_pips: Option<f64>,
    pub take_profit_pips: Option<f64>,
    /// New absolute stop for the tracked position.
    pub modified_stop: Option<f64>,
    /// `<label>,t=<reference>/<local>` once timing is known.
    pub label: String,
    /// The error that caused the cycle to be skipped.
    pub skipped: Option<CoreError>,
}

impl DecisionOutcome {
    fn idle(label: String, timing: Option<Timing>) -> Self {
        Self {
            signal: Signal::None,
            timing,
            volume: None,
            entry: None,
            stop_loss_pips: None,
            take_profit_pips: None,
            modified_stop: None,
            label,
            skipped: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

// ─── DecisionCore ───────────────────────────────────────────────────

/// One strategy instance on one symbol.
#[derive(Debug, Clone)]
pub struct DecisionCore {
    config: StrategyConfig,
    symbol: SymbolInfo,
    composer: Composer,
    loss_streak: LossStreak,
    tracked: Option<TrackedPosition>,
    pending: Option<EntryOrder>,
    /// Positions opened under our label whose close has not been settled.
    known: HashSet<PositionId>,
}

impl DecisionCore {
    pub fn new(config: StrategyConfig, symbol: SymbolInfo) -> Result<Self, ConfigError> {
        config.validate()?;
        symbol.validate().map_err(ConfigError::Invalid)?;

        let composer = Composer::new(config.gate.clone(), config.entry)
            .with_volatility(config.volatility)
            .with_exit(config.exit)
            .with_ratchet(config.ratchet);

        info!(
            label = %config.label,
            symbol = %symbol.name,
            timeframe = %config.timeframe,
            reference = %config.reference_timeframe(),
            entry = config.entry.name(),
            exit = config.exit.name(),
            sizing = config.sizing.name(),
            fingerprint = %config.fingerprint()?,
            "decision core ready"
        );

        Ok(Self {
            config,
            symbol,
            composer,
            loss_streak: LossStreak::new(),
            tracked: None,
            pending: None,
            known: HashSet::new(),
        })
    }

    /// Resume a loss streak persisted by the host (clamped to the floor).
    pub fn with_loss_streak(mut self, count: u32) -> Self {
        self.loss_streak = LossStreak::starting_at(count);
        self
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn symbol(&self) -> &SymbolInfo {
        &self.symbol
    }

    pub fn tracked_position(&self) -> Option<&TrackedPosition> {
        self.tracked.as_ref()
    }

    pub fn loss_streak(&self) -> u32 {
        self.loss_streak.get()
    }

    pub fn pending_entry(&self) -> Option<&EntryOrder> {
        self.pending.as_ref()
    }

    /// Run one cycle, recovering from every [`CoreError`] by skipping it.
    pub fn evaluate_cycle(&mut self, market: &MarketState) -> DecisionOutcome {
        match self.try_evaluate_cycle(market) {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_warmup() {
                    debug!(label = %self.config.label, error = %err, "cycle skipped: warm-up");
                } else {
                    warn!(label = %self.config.label, error = %err, "cycle skipped");
                }
                let mut outcome = DecisionOutcome::idle(self.config.label.clone(), None);
                outcome.skipped = Some(err);
                outcome
            }
        }
    }

    /// Run one cycle, surfacing errors.
    ///
    /// An errored cycle leaves the tracked position, pending entry and loss
    /// streak as they were (an expired pending entry is still cleared).
    pub fn try_evaluate_cycle(&mut self, market: &MarketState) -> Result<DecisionOutcome, CoreError> {
        self.expire_pending(market.time);

        let timing = market_timing(market)?;
        let label = format!("{},t={}", self.config.label, timing);

        if self.tracked.is_some() {
            return self.manage_position(market, timing, label);
        }

        if let Some(pending) = &self.pending {
            debug!(side = %pending.side, price = pending.price, "entry pending; not evaluating");
            return Ok(DecisionOutcome::idle(label, Some(timing)));
        }

        let signal = self.composer.compose_entry(&timing, market)?;
        let Some(side) = signal.entry_side() else {
            return Ok(DecisionOutcome::idle(label, Some(timing)));
        };

        let entry = self.entry_order(side, market)?;
        let stop_loss_pips = self
            .config
            .stop_loss
            .map(|d| d.resolve(&market.local, &self.symbol))
            .transpose()?;
        let take_profit_pips = self
            .config
            .take_profit
            .map(|d| d.resolve(&market.local, &self.symbol))
            .transpose()?;

        let request = SizingRequest {
            balance: market.balance,
            entry_price: entry.price,
            stop_loss_pips,
            loss_streak: self.loss_streak.get(),
        };
        let volume = self.config.sizing.size(&request, &self.symbol)?;

        info!(
            label = %label,
            signal = %signal,
            price = entry.price,
            volume,
            stop_loss_pips = ?stop_loss_pips,
            take_profit_pips = ?take_profit_pips,
            loss_streak = self.loss_streak.get(),
            "entry"
        );

        // Market entries too: blocks re-entry until the fill or cancel arrives.
        self.pending = Some(entry.clone());

        Ok(DecisionOutcome {
            signal,
            timing: Some(timing),
            volume: Some(volume),
            entry: Some(entry),
            stop_loss_pips,
            take_profit_pips,
            modified_stop: None,
            label,
            skipped: None,
        })
    }

    /// Apply a lifecycle notification from order management.
    pub fn on_event(&mut self, event: PositionEvent) {
        match event {
            PositionEvent::Opened(opened) => self.on_opened(opened),
            PositionEvent::Closed(closed) => self.on_closed(closed),
            PositionEvent::EntryCancelled => {
                if let Some(pending) = self.pending.take() {
                    info!(side = %pending.side, price = pending.price, "pending entry cancelled");
                }
            }
        }
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn manage_position(
        &mut self,
        market: &MarketState,
        timing: Timing,
        label: String,
    ) -> Result<DecisionOutcome, CoreError> {
        let Some(position) = self.tracked.as_mut() else {
            return Ok(DecisionOutcome::idle(label, Some(timing)));
        };
        let decision = self
            .composer
            .compose_exit(position, &timing, market, &self.symbol)?;

        let mut outcome = DecisionOutcome::idle(label, Some(timing));
        if decision.signal == Signal::Close {
            info!(position = %position.id, side = %position.side, "close");
            outcome.signal = Signal::Close;
            // The close notification still settles the loss streak via `known`.
            self.tracked = None;
            return Ok(outcome);
        }

        if let Some(proposed) = decision.ratchet_stop {
            let effective = position.ratchet_stop(proposed);
            info!(position = %position.id, stop = effective, "stop ratcheted");
            outcome.modified_stop = Some(effective);
        }
        Ok(outcome)
    }

    fn entry_order(&self, side: Side, market: &MarketState) -> Result<EntryOrder, CoreError> {
        match self.config.entry_kind {
            EntryKind::Market => Ok(EntryOrder {
                side,
                kind: EntryKind::Market,
                price: market.quote.entry_price(side),
                expires_at: None,
            }),
            kind @ EntryKind::StopAtSignalBar { expiry_hours } => {
                let price = match side {
                    Side::Long => market.local.last(SeriesKey::High)?,
                    Side::Short => market.local.last(SeriesKey::Low)?,
                };
                Ok(EntryOrder {
                    side,
                    kind,
                    price,
                    expires_at: Some(stop_order_expiry(market.time, expiry_hours)),
                })
            }
        }
    }

    fn expire_pending(&mut self, now: DateTime<Utc>) {
        let expired = self
            .pending
            .as_ref()
            .and_then(|p| p.expires_at)
            .is_some_and(|at| now >= at);
        if expired {
            if let Some(pending) = self.pending.take() {
                info!(side = %pending.side, price = pending.price, "pending entry expired");
            }
        }
    }

    fn on_opened(&mut self, opened: PositionOpened) {
        let prefix = opened.label.split(',').next().unwrap_or_default();
        if prefix != self.config.label {
            debug!(position = %opened.id, label = %opened.label, "ignoring foreign position");
            return;
        }
        if let Some(current) = &self.tracked {
            warn!(
                tracked = %current.id,
                opened = %opened.id,
                "position opened while another is tracked; replacing"
            );
        }
        info!(
            position = %opened.id,
            side = %opened.side,
            entry = opened.entry_price,
            "position opened"
        );
        self.pending = None;
        self.known.insert(opened.id);
        self.tracked = Some(TrackedPosition::new(
            opened.id,
            opened.side,
            opened.entry_price,
            opened.stop_loss,
            opened.take_profit,
            opened.label,
        ));
    }

    fn on_closed(&mut self, closed: PositionClosed) {
        if self.tracked.as_ref().is_some_and(|p| p.id == closed.id) {
            self.tracked = None;
        }
        if !self.known.remove(&closed.id) {
            debug!(position = %closed.id, "ignoring close of unknown or settled position");
            return;
        }
        if self.loss_streak.record(&closed) {
            info!(
                position = %closed.id,
                gross_profit = closed.gross_profit,
                loss_streak = self.loss_streak.get(),
                "position closed"
            );
        }
    }
}

/// Midnight UTC of the day containing `time + expiry_hours`, rolled forward a
/// day when that midnight is not after `time`.
pub fn stop_order_expiry(time: DateTime<Utc>, expiry_hours: u32) -> DateTime<Utc> {
    let target = time + Duration::hours(i64::from(expiry_hours));
    let midnight = target
        .date_naive()
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();
    if midnight > time {
        midnight
    } else {
        midnight
            .checked_add_days(Days::new(1))
            .unwrap_or(midnight)
    }
}
