//! Entry gates: the timing-code gate and the ATR volatility gate.

use serde::{Deserialize, Serialize};

use crate::domain::{SeriesKey, SeriesView, Side};
use crate::error::CoreError;
use crate::timing::{Frame, Timing, TimingCode};

fn codes(values: &[i8]) -> Vec<TimingCode> {
    values
        .iter()
        .filter_map(|&v| TimingCode::try_from(v).ok())
        .collect()
}

/// Direction-specific sets of permitted timing codes, read from one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingGate {
    #[serde(default)]
    pub frame: Frame,
    pub long: Vec<TimingCode>,
    pub short: Vec<TimingCode>,
}

impl TimingGate {
    pub fn new(frame: Frame, long: Vec<TimingCode>, short: Vec<TimingCode>) -> Self {
        Self { frame, long, short }
    }

    /// `{1, 4}` long, `{-1, -4}` short: trend and impulse agree.
    pub fn confirmed() -> Self {
        Self::new(Frame::Reference, codes(&[1, 4]), codes(&[-1, -4]))
    }

    /// `{1, 4, -2, -3}` long, `{-1, -4, 2, 3}` short: also admits exhausted
    /// counter-trends, for momentum-reversal entries.
    pub fn extended() -> Self {
        Self::new(Frame::Reference, codes(&[1, 4, -2, -3]), codes(&[-1, -4, 2, 3]))
    }

    /// `{1}` long, `{-1}` short.
    pub fn strict() -> Self {
        Self::new(Frame::Reference, codes(&[1]), codes(&[-1]))
    }

    /// Every code permits both sides; the trigger alone decides.
    pub fn open() -> Self {
        Self::new(
            Frame::Reference,
            TimingCode::ALL.to_vec(),
            TimingCode::ALL.to_vec(),
        )
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    /// True if the cycle's timing permits an entry on `side`.
    pub fn permits(&self, side: Side, timing: &Timing) -> bool {
        let code = timing.get(self.frame);
        match side {
            Side::Long => self.long.contains(&code),
            Side::Short => self.short.contains(&code),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.long.is_empty() && self.short.is_empty() {
            return Err("timing gate permits no codes on either side".into());
        }
        Ok(())
    }
}

/// Rejects entries in dead markets: `atr[0]` must reach `min_atr` (price units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityGate {
    pub min_atr: f64,
}

impl VolatilityGate {
    pub fn new(min_atr: f64) -> Self {
        Self { min_atr }
    }

    pub fn default_params() -> Self {
        Self::new(0.0002)
    }

    pub fn passes<V: SeriesView + ?Sized>(&self, view: &V) -> Result<bool, CoreError> {
        Ok(view.last(SeriesKey::Atr)? >= self.min_atr)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_atr.is_nan() || self.min_atr < 0.0 {
            return Err(format!("min_atr must be >= 0, got {}", self.min_atr));
        }
        Ok(())
    }
}
