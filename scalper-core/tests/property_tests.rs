//! Property tests for decision-core invariants.
//!
//! Uses proptest to verify:
//! 1. Timing code domain: classification always lands in {±1, ±2, ±3, ±4}
//! 2. Classifier purity: identical inputs give identical codes
//! 3. Loss-streak floor: the streak never drops below 1
//! 4. Ratchet monotonicity: stops only tighten
//! 5. Single position: the driver never tracks more than one position
//! 6. Volume normalization: sized volumes sit on the step grid, within bounds

use proptest::prelude::*;
use scalper_core::composer::RatchetState;
use scalper_core::domain::{
    MarketState, PositionClosed, PositionEvent, PositionId, PositionOpened, Quote, SeriesKey,
    SeriesSnapshot, Side, SymbolInfo,
};
use scalper_core::sizing::{LossStreak, SizingPolicy, SizingRequest};
use scalper_core::timing::{classify, TimingCode};
use scalper_core::{DecisionCore, StrategyPreset};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_macd() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        (-0.01..0.01_f64),
        (-0.01..0.01_f64).prop_map(|v| (v * 10_000.0).round() / 10_000.0),
    ]
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Long), Just(Side::Short)]
}

fn arb_price() -> impl Strategy<Value = f64> {
    (0.5..2.0_f64).prop_map(|p| (p * 100_000.0).round() / 100_000.0)
}

fn arb_policy() -> impl Strategy<Value = SizingPolicy> {
    prop_oneof![
        (0.1..5.0_f64).prop_map(|risk_percent| SizingPolicy::RiskBased { risk_percent }),
        (1_000.0..20_000.0_f64).prop_map(|base_volume| SizingPolicy::Doubling { base_volume }),
        (1_000.0..200_000.0_f64).prop_map(|volume| SizingPolicy::Fixed { volume }),
        (1_000.0..20_000.0_f64, 0.0..10_000.0_f64)
            .prop_map(|(base_volume, step)| SizingPolicy::LinearStep { base_volume, step }),
    ]
}

/// One lifecycle event against a small id space so duplicates are common.
#[derive(Debug, Clone)]
enum Op {
    Open(u64),
    Close(u64, f64),
    Cancel,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1..6u64).prop_map(Op::Open),
        (1..6u64, -100.0..100.0_f64).prop_map(|(id, pnl)| Op::Close(id, pnl)),
        Just(Op::Cancel),
    ]
}

// ── 1. Timing Code Domain ────────────────────────────────────────────

proptest! {
    #[test]
    fn classification_stays_in_domain(up: bool, h in arb_macd(), s in arb_macd()) {
        let code = classify(up, h, s);
        prop_assert!(TimingCode::ALL.contains(&code));
        prop_assert_eq!(code.is_uptrend(), up);
    }

    /// Zero never leaves the domain either, whichever side it falls on.
    #[test]
    fn zero_inputs_stay_in_domain(up: bool, s in arb_macd()) {
        prop_assert!(TimingCode::ALL.contains(&classify(up, 0.0, s)));
        prop_assert!(TimingCode::ALL.contains(&classify(up, s, 0.0)));
    }
}

// ── 2. Classifier Purity ─────────────────────────────────────────────

proptest! {
    #[test]
    fn classification_is_deterministic(up: bool, h in arb_macd(), s in arb_macd()) {
        prop_assert_eq!(classify(up, h, s), classify(up, h, s));
    }
}

// ── 3. Loss-Streak Floor ─────────────────────────────────────────────

proptest! {
    #[test]
    fn streak_never_below_floor(
        closes in prop::collection::vec((1..20u64, -100.0..100.0_f64), 0..60),
    ) {
        let mut streak = LossStreak::new();
        for (id, gross_profit) in closes {
            let before = streak.get();
            let counted = streak.record(&PositionClosed { id: PositionId(id), gross_profit });
            prop_assert!(streak.get() >= LossStreak::FLOOR);
            if !counted {
                prop_assert_eq!(streak.get(), before);
            }
        }
    }

    /// Recording the same close twice changes nothing the second time.
    #[test]
    fn duplicate_close_is_ignored(id in 1..1000u64, gross_profit in -100.0..100.0_f64) {
        let mut streak = LossStreak::starting_at(3);
        let closed = PositionClosed { id: PositionId(id), gross_profit };
        prop_assert!(streak.record(&closed));
        let after_first = streak.get();
        prop_assert!(!streak.record(&closed));
        prop_assert_eq!(streak.get(), after_first);
    }
}

// ── 4. Ratchet Monotonicity ──────────────────────────────────────────

proptest! {
    #[test]
    fn ratchet_only_tightens(
        side in arb_side(),
        initial in arb_price(),
        proposals in prop::collection::vec(arb_price(), 1..30),
    ) {
        let mut state = RatchetState::with_initial_level(side, initial);
        let mut previous = initial;
        for proposed in proposals {
            let effective = state.apply(proposed);
            match side {
                Side::Long => prop_assert!(effective >= previous),
                Side::Short => prop_assert!(effective <= previous),
            }
            prop_assert_eq!(state.current_level(), Some(effective));
            previous = effective;
        }
    }
}

// ── 5. Single Position ───────────────────────────────────────────────

/// Bullish frames with RSI re-entering from below 30: the entry fires
/// whenever the core is free to trade.
fn triggering_market() -> MarketState {
    let frame = SeriesSnapshot::new()
        .with(SeriesKey::Close, vec![1.1000; 3])
        .with(SeriesKey::TrendMa, vec![1.0950; 3])
        .with(SeriesKey::MacdHistogram, vec![0.0002; 3])
        .with(SeriesKey::MacdSignal, vec![0.0001; 3]);
    MarketState {
        time: chrono::Utc::now(),
        balance: 10_000.0,
        quote: Quote::new(1.1000, 1.1001),
        local: frame.clone().with(SeriesKey::Rsi, vec![25.0, 29.0, 33.0]),
        reference: frame,
    }
}

proptest! {
    #[test]
    fn at_most_one_position_tracked(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut core = DecisionCore::new(
            StrategyPreset::RsiReversal.to_config(),
            SymbolInfo::fx_major("EURUSD"),
        ).unwrap();
        let market = triggering_market();

        for op in ops {
            let event = match op {
                Op::Open(id) => PositionEvent::Opened(PositionOpened {
                    id: PositionId(id),
                    side: Side::Long,
                    entry_price: 1.1000,
                    stop_loss: None,
                    take_profit: None,
                    label: "scalper,t=1/1".into(),
                }),
                Op::Close(id, gross_profit) => PositionEvent::Closed(PositionClosed {
                    id: PositionId(id),
                    gross_profit,
                }),
                Op::Cancel => PositionEvent::EntryCancelled,
            };
            core.on_event(event);
            prop_assert!(core.loss_streak() >= 1);

            let tracked = core.tracked_position().is_some();
            let idle = !tracked && core.pending_entry().is_none();
            let outcome = core.evaluate_cycle(&market);
            // A tracked position rules out entries; a free core takes one.
            if tracked {
                prop_assert!(outcome.entry.is_none());
                prop_assert!(core.pending_entry().is_none());
            }
            if idle {
                prop_assert!(outcome.entry.is_some());
            }
        }
    }
}

// ── 6. Volume Normalization ──────────────────────────────────────────

proptest! {
    #[test]
    fn volume_on_step_grid_within_bounds(
        policy in arb_policy(),
        balance in 100.0..1_000_000.0_f64,
        entry_price in arb_price(),
        stop_loss_pips in 1.0..200.0_f64,
        loss_streak in 1..12u32,
    ) {
        let symbol = SymbolInfo::fx_major("EURUSD").with_volume_bounds(1_000.0, 1_000_000.0);
        let request = SizingRequest {
            balance,
            entry_price,
            stop_loss_pips: Some(stop_loss_pips),
            loss_streak,
        };
        let volume = policy.size(&request, &symbol).unwrap();

        prop_assert!(volume >= symbol.min_volume);
        prop_assert!(volume <= symbol.max_volume);
        let steps = volume / symbol.volume_step;
        prop_assert!((steps - steps.round()).abs() < 1e-6);
    }
}
