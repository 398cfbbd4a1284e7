//! Trend-timing classifier: one 8-valued trend/momentum code per timeframe.
//!
//! The sign is the trend direction (close against a baseline moving average).
//! The magnitude is how the MACD histogram and signal line relate to that trend:
//! - 1: both agree with the trend (confirmed)
//! - 2: histogram disagrees, signal agrees (early weakening)
//! - 3: both disagree (contrarian; the fallback case)
//! - 4: histogram agrees, signal disagrees (fresh reversal impulse)
//!
//! The zero boundaries are not symmetric between the two branches.
//! See [`classify`] for the exact predicate table.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{MarketState, SeriesKey, SeriesView, Side};
use crate::error::{ConfigError, CoreError};

// ─── TimingCode ─────────────────────────────────────────────────────

/// A timing code in `{-4, -3, -2, -1, 1, 2, 3, 4}`. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct TimingCode(i8);

impl TimingCode {
    pub const ALL: [TimingCode; 8] = [
        TimingCode(-4),
        TimingCode(-3),
        TimingCode(-2),
        TimingCode(-1),
        TimingCode(1),
        TimingCode(2),
        TimingCode(3),
        TimingCode(4),
    ];

    pub fn new(code: i8) -> Result<Self, ConfigError> {
        Self::try_from(code)
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// True when the trend component is up.
    pub fn is_uptrend(self) -> bool {
        self.0 > 0
    }

    /// Trend direction as a side.
    pub fn trend(self) -> Side {
        if self.is_uptrend() {
            Side::Long
        } else {
            Side::Short
        }
    }

    /// Magnitude in `1..=4`.
    pub fn magnitude(self) -> u8 {
        self.0.unsigned_abs()
    }
}

impl TryFrom<i8> for TimingCode {
    type Error = ConfigError;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            -4..=-1 | 1..=4 => Ok(Self(code)),
            other => Err(ConfigError::InvalidTimingCode(other)),
        }
    }
}

impl From<TimingCode> for i8 {
    fn from(code: TimingCode) -> Self {
        code.0
    }
}

impl fmt::Display for TimingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Timing pair ────────────────────────────────────────────────────

/// Which timeframe a timing code was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    #[default]
    Reference,
    Local,
}

/// Timing codes for the reference and local timeframes of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub reference: TimingCode,
    pub local: TimingCode,
}

impl Timing {
    pub fn new(reference: TimingCode, local: TimingCode) -> Self {
        Self { reference, local }
    }

    pub fn get(&self, frame: Frame) -> TimingCode {
        match frame {
            Frame::Reference => self.reference,
            Frame::Local => self.local,
        }
    }
}

/// Formats as `reference/local`, the label convention for diagnostics.
impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.reference, self.local)
    }
}

// ─── Classification ─────────────────────────────────────────────────

/// Trend is up when the baseline moving average sits below the close.
pub fn is_trend_up(trend_ma: f64, close: f64) -> bool {
    trend_ma < close
}

/// Map trend direction + MACD histogram/signal to a timing code.
///
/// ```text
/// up:   h > 0  && s > 0  →  1     !up:  h < 0  && s < 0  → -1
///       h > 0  && s < 0  →  4           h < 0  && s > 0  → -4
///       h <= 0 && s >= 0 →  2           h >= 0 && s <= 0 → -2
///       otherwise        →  3           otherwise        → -3
/// ```
///
/// # Example
/// ```
/// use scalper_core::timing::classify;
///
/// assert_eq!(classify(true, 0.0002, 0.0001).value(), 1);
/// assert_eq!(classify(true, 0.0002, -0.0001).value(), 4);
/// assert_eq!(classify(false, -0.0001, 0.0002).value(), -4);
/// ```
pub fn classify(up: bool, histogram: f64, signal: f64) -> TimingCode {
    let (h, s) = (histogram, signal);
    let code = if up {
        if h > 0.0 && s > 0.0 {
            1
        } else if h > 0.0 && s < 0.0 {
            4
        } else if h <= 0.0 && s >= 0.0 {
            2
        } else {
            3
        }
    } else if h < 0.0 && s < 0.0 {
        -1
    } else if h < 0.0 && s > 0.0 {
        -4
    } else if h >= 0.0 && s <= 0.0 {
        -2
    } else {
        -3
    };
    TimingCode(code)
}

/// Classify one timeframe from its last completed bar.
///
/// Reads `close`, `trend_ma`, `macd_histogram` and `macd_signal` at index 0.
pub fn classify_series<V: SeriesView + ?Sized>(view: &V) -> Result<TimingCode, CoreError> {
    let close = view.last(SeriesKey::Close)?;
    let trend_ma = view.last(SeriesKey::TrendMa)?;
    let histogram = view.last(SeriesKey::MacdHistogram)?;
    let signal = view.last(SeriesKey::MacdSignal)?;
    Ok(classify(is_trend_up(trend_ma, close), histogram, signal))
}

/// Build the `reference/local` timing pair for a cycle.
pub fn market_timing(market: &MarketState) -> Result<Timing, CoreError> {
    let reference = classify_series(&market.reference)?;
    let local = classify_series(&market.local)?;
    Ok(Timing::new(reference, local))
}
