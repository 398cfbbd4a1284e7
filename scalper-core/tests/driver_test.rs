//! Decision-cycle tests through `DecisionCore`: entries, pending orders,
//! exits, ratchets, lifecycle events and error recovery.

use chrono::{DateTime, TimeZone, Utc};
use scalper_core::composer::Signal;
use scalper_core::config::{EntryKind, StrategyPreset};
use scalper_core::domain::{
    MarketState, PositionClosed, PositionEvent, PositionId, PositionOpened, Quote, SeriesKey,
    SeriesSnapshot, Side, SymbolInfo,
};
use scalper_core::{CoreError, DecisionCore, SizingPolicy, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn t(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

/// Timing inputs for one frame: code 1 when `up`, -1 otherwise.
fn timing_frame(up: bool) -> SeriesSnapshot {
    let (trend_ma, hist, signal) = if up {
        (1.0950, 0.0002, 0.0001)
    } else {
        (1.1050, -0.0002, -0.0001)
    };
    SeriesSnapshot::new()
        .with(SeriesKey::Close, vec![1.1000; 3])
        .with(SeriesKey::TrendMa, vec![trend_ma; 3])
        .with(SeriesKey::MacdHistogram, vec![hist; 3])
        .with(SeriesKey::MacdSignal, vec![signal; 3])
}

fn market(time: DateTime<Utc>, local: SeriesSnapshot, reference: SeriesSnapshot) -> MarketState {
    MarketState {
        time,
        balance: 10_000.0,
        quote: Quote::new(1.1000, 1.1001),
        local,
        reference,
    }
}

fn rsi_market(up: bool, rsi: &[f64]) -> MarketState {
    market(
        t(15, 10),
        timing_frame(up).with(SeriesKey::Rsi, rsi.to_vec()),
        timing_frame(up),
    )
}

fn core(config: StrategyConfig) -> DecisionCore {
    DecisionCore::new(config, SymbolInfo::fx_major("EURUSD")).unwrap()
}

fn opened(id: u64, side: Side, entry: f64, stop: Option<f64>, label: &str) -> PositionEvent {
    PositionEvent::Opened(PositionOpened {
        id: PositionId(id),
        side,
        entry_price: entry,
        stop_loss: stop,
        take_profit: None,
        label: label.into(),
    })
}

fn closed(id: u64, gross_profit: f64) -> PositionEvent {
    PositionEvent::Closed(PositionClosed {
        id: PositionId(id),
        gross_profit,
    })
}

// ── Entries ──────────────────────────────────────────────────────────

#[test]
fn rsi_reversal_opens_long_at_ask() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    let outcome = core.evaluate_cycle(&rsi_market(true, &[25.0, 29.0, 33.0]));

    assert_eq!(outcome.signal, Signal::OpenLong);
    assert_eq!(outcome.label, "scalper,t=1/1");
    assert_eq!(outcome.volume, Some(10_000.0));
    let entry = outcome.entry.unwrap();
    assert_eq!(entry.side, Side::Long);
    assert_eq!(entry.kind, EntryKind::Market);
    assert_eq!(entry.price, 1.1001);
    assert_eq!(entry.expires_at, None);
    assert!(outcome.skipped.is_none());
}

#[test]
fn rsi_reversal_opens_short_at_bid() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    let outcome = core.evaluate_cycle(&rsi_market(false, &[75.0, 72.0, 65.0]));

    assert_eq!(outcome.signal, Signal::OpenShort);
    assert_eq!(outcome.label, "scalper,t=-1/-1");
    assert_eq!(outcome.entry.unwrap().price, 1.1000);
}

#[test]
fn no_trigger_means_no_signal() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    let outcome = core.evaluate_cycle(&rsi_market(true, &[45.0, 50.0, 55.0]));
    assert_eq!(outcome.signal, Signal::None);
    assert_eq!(outcome.volume, None);
    assert!(outcome.timing.is_some());
    assert!(core.pending_entry().is_none());
}

#[test]
fn ema_stochastic_sizes_by_risk() {
    let mut core = core(StrategyPreset::EmaStochastic.to_config());
    let local = timing_frame(true)
        .with(SeriesKey::FastMa, vec![1.0990, 1.0995, 1.1001])
        .with(SeriesKey::SlowMa, vec![1.1000; 3])
        .with(SeriesKey::StochK, vec![10.0, 12.0, 15.0])
        .with(SeriesKey::StochD, vec![11.0, 12.0, 14.0])
        .with(SeriesKey::Atr, vec![0.0005; 3]);
    let outcome = core.evaluate_cycle(&market(t(15, 10), local, timing_frame(true)));

    assert_eq!(outcome.signal, Signal::OpenLong);
    // 100 / (1.1001 * 0.0001 * 30) ≈ 30300 → 30000
    assert_eq!(outcome.volume, Some(30_000.0));
    assert_eq!(outcome.stop_loss_pips, Some(30.0));
    assert_eq!(outcome.take_profit_pips, Some(10.0));
}

#[test]
fn dead_market_blocks_entry() {
    let mut core = core(StrategyPreset::EmaStochastic.to_config());
    let local = timing_frame(true)
        .with(SeriesKey::FastMa, vec![1.0990, 1.0995, 1.1001])
        .with(SeriesKey::SlowMa, vec![1.1000; 3])
        .with(SeriesKey::StochK, vec![10.0, 12.0, 15.0])
        .with(SeriesKey::StochD, vec![11.0, 12.0, 14.0])
        .with(SeriesKey::Atr, vec![0.0001; 3]);
    let outcome = core.evaluate_cycle(&market(t(15, 10), local, timing_frame(true)));
    assert_eq!(outcome.signal, Signal::None);
    assert!(outcome.skipped.is_none());
}

// ── Pending entries ──────────────────────────────────────────────────

#[test]
fn pending_entry_blocks_reentry_until_cancelled() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    let m = rsi_market(true, &[25.0, 29.0, 33.0]);

    assert_eq!(core.evaluate_cycle(&m).signal, Signal::OpenLong);
    assert!(core.pending_entry().is_some());
    assert_eq!(core.evaluate_cycle(&m).signal, Signal::None);

    core.on_event(PositionEvent::EntryCancelled);
    assert!(core.pending_entry().is_none());
    assert_eq!(core.evaluate_cycle(&m).signal, Signal::OpenLong);
}

#[test]
fn stop_entry_at_signal_bar_high_with_expiry() {
    let mut core = core(StrategyPreset::MaBreakout.to_config());
    let local = SeriesSnapshot::new()
        .with(SeriesKey::Close, vec![1.0990, 1.0995, 1.1010])
        .with(SeriesKey::TrendMa, vec![1.1000; 3])
        .with(SeriesKey::MacdHistogram, vec![0.0001; 3])
        .with(SeriesKey::MacdSignal, vec![0.0001; 3])
        .with(SeriesKey::High, vec![1.1000, 1.1005, 1.1020])
        .with(SeriesKey::Low, vec![1.0980, 1.0985, 1.0990]);
    let reference = timing_frame(false);

    let first = core.evaluate_cycle(&market(t(15, 10), local.clone(), reference.clone()));
    assert_eq!(first.signal, Signal::OpenLong);
    let entry = first.entry.unwrap();
    assert_eq!(entry.kind, EntryKind::StopAtSignalBar { expiry_hours: 8 });
    assert_eq!(entry.price, 1.1020);
    assert_eq!(entry.expires_at, Some(t(16, 0)));
    // 100 / (1.1020 * 0.0001 * 40) ≈ 22686 → 23000
    assert_eq!(first.volume, Some(23_000.0));
    assert_eq!(first.take_profit_pips, Some(80.0));

    // Still pending before expiry.
    let waiting = core.evaluate_cycle(&market(t(15, 23), local.clone(), reference.clone()));
    assert_eq!(waiting.signal, Signal::None);

    // Expired at midnight: the entry is re-evaluated.
    let again = core.evaluate_cycle(&market(t(16, 0), local, reference));
    assert_eq!(again.signal, Signal::OpenLong);
    assert_eq!(again.entry.unwrap().expires_at, Some(t(17, 0)));
}

// ── Positions and exits ──────────────────────────────────────────────

#[test]
fn tracked_position_runs_exit_logic_only() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    core.evaluate_cycle(&rsi_market(true, &[25.0, 29.0, 33.0]));
    core.on_event(opened(1, Side::Long, 1.1001, None, "scalper,t=1/1"));
    assert!(core.pending_entry().is_none());
    assert_eq!(core.tracked_position().map(|p| p.id), Some(PositionId(1)));

    // Entry conditions hold again but a position is tracked: no entry.
    let hold = core.evaluate_cycle(&rsi_market(true, &[25.0, 29.0, 33.0]));
    assert_eq!(hold.signal, Signal::None);

    let exit = core.evaluate_cycle(&rsi_market(true, &[60.0, 65.0, 71.0]));
    assert_eq!(exit.signal, Signal::Close);
    assert!(core.tracked_position().is_none());

    // The close notification after our own Close still settles the streak.
    core.on_event(closed(1, -12.0));
    assert_eq!(core.loss_streak(), 2);
    core.on_event(closed(1, -12.0));
    assert_eq!(core.loss_streak(), 2);
}

#[test]
fn foreign_positions_are_ignored() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    core.on_event(opened(7, Side::Long, 1.1000, None, "scalperv7,t=1/1"));
    assert!(core.tracked_position().is_none());
    core.on_event(closed(7, -50.0));
    assert_eq!(core.loss_streak(), 1);
}

#[test]
fn ratchet_locks_profit_once() {
    let mut core = core(StrategyPreset::RsiExtreme.to_config());
    core.on_event(opened(5, Side::Long, 1.0990, Some(1.0960), "scalper"));
    let m = market(t(15, 10), timing_frame(true), timing_frame(true));

    let first = core.evaluate_cycle(&m);
    assert_eq!(first.signal, Signal::None);
    let stop = first.modified_stop.unwrap();
    assert!((stop - 1.0992).abs() < 1e-9);
    let tracked = core.tracked_position().unwrap().stop_loss().unwrap();
    assert!((tracked - 1.0992).abs() < 1e-9);

    let second = core.evaluate_cycle(&m);
    assert_eq!(second.modified_stop, None);
}

#[test]
fn doubling_escalates_across_losses() {
    let mut config = StrategyPreset::RsiReversal.to_config();
    config.sizing = SizingPolicy::Doubling {
        base_volume: 1_000.0,
    };
    let mut core = core(config);
    let m = rsi_market(true, &[25.0, 29.0, 33.0]);

    let mut volumes = Vec::new();
    for id in 1..=3 {
        let outcome = core.evaluate_cycle(&m);
        volumes.push(outcome.volume.unwrap());
        core.on_event(opened(id, Side::Long, 1.1001, None, "scalper,t=1/1"));
        core.on_event(closed(id, -10.0));
    }
    assert_eq!(volumes, vec![1_000.0, 2_000.0, 4_000.0]);
    assert_eq!(core.loss_streak(), 4);
}

// ── Trend stack ──────────────────────────────────────────────────────

/// Five bars of a rising MA stack (slow above trend) with MACD crossing up
/// from below -0.0003 on the last bar.
fn trend_stack_frame() -> SeriesSnapshot {
    SeriesSnapshot::new()
        .with(SeriesKey::Close, vec![1.1000; 5])
        .with(SeriesKey::MacdHistogram, vec![0.0001; 5])
        .with(SeriesKey::FastMa, vec![1.0960, 1.0965, 1.0970, 1.0975, 1.0980])
        .with(SeriesKey::SlowMa, vec![1.0940, 1.0942, 1.0944, 1.0946, 1.0948])
        .with(SeriesKey::TrendMa, vec![1.0900, 1.0901, 1.0902, 1.0903, 1.0904])
        .with(SeriesKey::TriggerMa, vec![1.0990; 5])
        .with(SeriesKey::Macd, vec![-0.0006, -0.0006, -0.0006, -0.0006, -0.0004])
        .with(SeriesKey::MacdSignal, vec![-0.0005; 5])
}

#[test]
fn trend_stack_opens_long_with_linear_sizing() {
    let mut core = core(StrategyPreset::TrendStack.to_config());
    let m = market(t(15, 10), trend_stack_frame(), timing_frame(false));

    // The open gate ignores the bearish reference frame.
    let outcome = core.evaluate_cycle(&m);
    assert_eq!(outcome.signal, Signal::OpenLong);
    assert_eq!(outcome.volume, Some(10_000.0));
    assert_eq!(outcome.stop_loss_pips, Some(10.0));
    assert_eq!(outcome.take_profit_pips, Some(10.0));
}

#[test]
fn trend_stack_steps_volume_after_losses() {
    let mut core = core(StrategyPreset::TrendStack.to_config());
    let m = market(t(15, 10), trend_stack_frame(), timing_frame(true));

    let mut volumes = Vec::new();
    for id in 1..=3 {
        let outcome = core.evaluate_cycle(&m);
        volumes.push(outcome.volume.unwrap());
        core.on_event(opened(id, Side::Long, 1.1001, None, &outcome.label));
        core.on_event(closed(id, -10.0));
    }
    // Streak 1 takes the base; streak n > 1 takes base + step * n.
    assert_eq!(volumes, vec![10_000.0, 30_000.0, 40_000.0]);
    assert_eq!(core.loss_streak(), 4);
}

#[test]
fn trend_reversal_closes_tracked_long() {
    let mut core = core(StrategyPreset::TrendStack.to_config());
    core.on_event(opened(3, Side::Long, 1.0990, None, "scalper"));

    // Stack intact, MACD still above its signal: hold.
    let hold = core.evaluate_cycle(&market(t(15, 10), trend_stack_frame(), timing_frame(true)));
    assert_eq!(hold.signal, Signal::None);
    assert!(core.tracked_position().is_some());

    // MACD crosses back under its signal while slow stays above trend.
    let local = trend_stack_frame()
        .with(SeriesKey::Macd, vec![-0.0006, -0.0006, -0.0006, -0.0004, -0.0006]);
    let exit = core.evaluate_cycle(&market(t(15, 11), local, timing_frame(true)));
    assert_eq!(exit.signal, Signal::Close);
    assert!(core.tracked_position().is_none());
}

// ── Error recovery ───────────────────────────────────────────────────

#[test]
fn warmup_skips_cycle_without_error() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    let mut m = rsi_market(true, &[25.0, 29.0, 33.0]);
    m.reference = m
        .reference
        .with(SeriesKey::TrendMa, vec![f64::NAN, f64::NAN, f64::NAN]);

    assert!(matches!(
        core.try_evaluate_cycle(&m),
        Err(CoreError::WarmupIncomplete { .. })
    ));

    let outcome = core.evaluate_cycle(&m);
    assert_eq!(outcome.signal, Signal::None);
    assert_eq!(outcome.timing, None);
    assert_eq!(outcome.label, "scalper");
    assert!(outcome.skipped.unwrap().is_recoverable());
    assert_eq!(core.loss_streak(), 1);
}

#[test]
fn short_history_skips_cycle() {
    let mut core = core(StrategyPreset::RsiReversal.to_config());
    let outcome = core.evaluate_cycle(&rsi_market(true, &[33.0]));
    assert!(matches!(
        outcome.skipped,
        Some(CoreError::SeriesUnavailable { .. })
    ));
}

#[test]
fn invalid_sizing_skips_cycle_and_places_nothing() {
    let mut core = core(StrategyPreset::EmaStochastic.to_config());
    let local = timing_frame(true)
        .with(SeriesKey::FastMa, vec![1.0990, 1.0995, 1.1001])
        .with(SeriesKey::SlowMa, vec![1.1000; 3])
        .with(SeriesKey::StochK, vec![10.0, 12.0, 15.0])
        .with(SeriesKey::StochD, vec![11.0, 12.0, 14.0])
        .with(SeriesKey::Atr, vec![0.0005; 3]);
    let mut m = market(t(15, 10), local, timing_frame(true));
    m.balance = 0.0;

    let outcome = core.evaluate_cycle(&m);
    assert_eq!(outcome.signal, Signal::None);
    assert!(matches!(
        outcome.skipped,
        Some(CoreError::InvalidSizingInput(_))
    ));
    assert!(core.pending_entry().is_none());
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut config = StrategyPreset::MacdCross.to_config();
    config.label = String::new();
    assert!(DecisionCore::new(config, SymbolInfo::fx_major("EURUSD")).is_err());

    let mut symbol = SymbolInfo::fx_major("EURUSD");
    symbol.volume_step = 0.0;
    assert!(DecisionCore::new(StrategyPreset::MacdCross.to_config(), symbol).is_err());
}

#[test]
fn nan_volume_bound_is_rejected_at_construction() {
    let symbol = SymbolInfo::fx_major("EURUSD").with_volume_bounds(f64::NAN, 1e6);
    let err = DecisionCore::new(StrategyPreset::RsiReversal.to_config(), symbol).unwrap_err();
    assert!(err.to_string().contains("min_volume"));
}
