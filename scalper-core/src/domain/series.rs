//! Series access: read-only, completed-bar views of price and indicator outputs.
//!
//! Indicator math is external. Callers precompute every series and hand the
//! core a snapshot per timeframe. Values are addressed by "bars back" from the
//! most recent *completed* bar (`0` = last closed bar); the in-progress bar is
//! never part of a snapshot, so nothing here can look ahead.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Well-known series roles read by the classifier and composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKey {
    Close,
    High,
    Low,
    /// Baseline moving average for trend direction.
    TrendMa,
    Macd,
    MacdSignal,
    MacdHistogram,
    FastMa,
    SlowMa,
    /// Short MA used to detect an early reversal against the slow MA.
    TriggerMa,
    Rsi,
    StochK,
    StochD,
    Atr,
}

impl SeriesKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesKey::Close => "close",
            SeriesKey::High => "high",
            SeriesKey::Low => "low",
            SeriesKey::TrendMa => "trend_ma",
            SeriesKey::Macd => "macd",
            SeriesKey::MacdSignal => "macd_signal",
            SeriesKey::MacdHistogram => "macd_histogram",
            SeriesKey::FastMa => "fast_ma",
            SeriesKey::SlowMa => "slow_ma",
            SeriesKey::TriggerMa => "trigger_ma",
            SeriesKey::Rsi => "rsi",
            SeriesKey::StochK => "stoch_k",
            SeriesKey::StochD => "stoch_d",
            SeriesKey::Atr => "atr",
        }
    }

    pub fn all() -> &'static [SeriesKey] {
        &[
            SeriesKey::Close,
            SeriesKey::High,
            SeriesKey::Low,
            SeriesKey::TrendMa,
            SeriesKey::Macd,
            SeriesKey::MacdSignal,
            SeriesKey::MacdHistogram,
            SeriesKey::FastMa,
            SeriesKey::SlowMa,
            SeriesKey::TriggerMa,
            SeriesKey::Rsi,
            SeriesKey::StochK,
            SeriesKey::StochD,
            SeriesKey::Atr,
        ]
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeriesKey::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown series '{s}'"))
    }
}

/// Read-only access to completed-bar values.
///
/// Only `value` is required; the crossover and slope helpers are built on it
/// and propagate the same errors (a lookback past the history is a warm-up
/// condition, not a `false`).
pub trait SeriesView {
    /// Value of `key` at `bars_back` completed bars before now.
    fn value(&self, key: SeriesKey, bars_back: usize) -> Result<f64, CoreError>;

    /// Most recent completed value.
    fn last(&self, key: SeriesKey) -> Result<f64, CoreError> {
        self.value(key, 0)
    }

    /// `a` crossed above `b` on some bar `k` in `0..=within`.
    ///
    /// A cross at `k` means `a[k] > b[k]` and `a[k+1] <= b[k+1]`.
    fn crossed_above(&self, a: SeriesKey, b: SeriesKey, within: usize) -> Result<bool, CoreError> {
        for k in 0..=within {
            if self.value(a, k)? > self.value(b, k)?
                && self.value(a, k + 1)? <= self.value(b, k + 1)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `a` crossed below `b` on some bar `k` in `0..=within`.
    fn crossed_below(&self, a: SeriesKey, b: SeriesKey, within: usize) -> Result<bool, CoreError> {
        for k in 0..=within {
            if self.value(a, k)? < self.value(b, k)?
                && self.value(a, k + 1)? >= self.value(b, k + 1)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Mean of the last `periods` values is above the oldest of them.
    fn is_rising(&self, key: SeriesKey, periods: usize) -> Result<bool, CoreError> {
        let (mean, oldest) = window_mean(self, key, periods)?;
        Ok(mean > oldest)
    }

    /// Mean of the last `periods` values is below the oldest of them.
    fn is_falling(&self, key: SeriesKey, periods: usize) -> Result<bool, CoreError> {
        let (mean, oldest) = window_mean(self, key, periods)?;
        Ok(mean < oldest)
    }
}

fn window_mean<V: SeriesView + ?Sized>(
    view: &V,
    key: SeriesKey,
    periods: usize,
) -> Result<(f64, f64), CoreError> {
    let periods = periods.max(1);
    let mut sum = 0.0;
    for k in 0..periods {
        sum += view.value(key, k)?;
    }
    Ok((sum / periods as f64, view.value(key, periods - 1)?))
}

/// In-memory snapshot of one timeframe's completed bars.
///
/// Each series is stored oldest-first, like a precomputed indicator output.
/// Series may have different lengths; each is indexed from its own end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSnapshot {
    series: HashMap<SeriesKey, Vec<f64>>,
}

impl SeriesSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a series, oldest value first.
    pub fn insert(&mut self, key: SeriesKey, values: Vec<f64>) {
        self.series.insert(key, values);
    }

    /// Builder-style insert.
    pub fn with(mut self, key: SeriesKey, values: Vec<f64>) -> Self {
        self.insert(key, values);
        self
    }

    /// Number of completed bars available for `key` (0 if missing).
    pub fn available(&self, key: SeriesKey) -> usize {
        self.series.get(&key).map_or(0, Vec::len)
    }

    pub fn contains(&self, key: SeriesKey) -> bool {
        self.series.contains_key(&key)
    }

    /// Number of series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl SeriesView for SeriesSnapshot {
    fn value(&self, key: SeriesKey, bars_back: usize) -> Result<f64, CoreError> {
        let values = self.series.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let available = values.len();
        if bars_back >= available {
            return Err(CoreError::SeriesUnavailable {
                series: key.as_str().to_string(),
                bars_back,
                available,
            });
        }
        let v = values[available - 1 - bars_back];
        if v.is_nan() {
            return Err(CoreError::WarmupIncomplete {
                series: key.as_str().to_string(),
                bars_back,
            });
        }
        Ok(v)
    }
}
