use serde::{Deserialize, Serialize};

/// Rounding mode applied when snapping a volume to the broker's step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VolumeRounding {
    /// Round to nearest step
    #[default]
    ToNearest,
    /// Round down (never risk more than computed)
    Down,
    /// Round up
    Up,
}

/// Symbol metadata: pip size and tradable volume granularity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolInfo {
    pub name: String,
    /// Minimum meaningful price increment (0.0001 for most FX majors).
    pub pip_size: f64,
    /// Volume granularity in units (e.g., 1000 = one micro lot).
    pub volume_step: f64,
    pub min_volume: f64,
    pub max_volume: f64,
    #[serde(default)]
    pub rounding: VolumeRounding,
}

impl SymbolInfo {
    pub fn new(name: impl Into<String>, pip_size: f64, volume_step: f64) -> Self {
        Self {
            name: name.into(),
            pip_size,
            volume_step,
            min_volume: volume_step,
            max_volume: 100_000_000.0,
            rounding: VolumeRounding::ToNearest,
        }
    }

    /// Typical 5-digit FX major: pip 0.0001, micro-lot step of 1000 units.
    pub fn fx_major(name: impl Into<String>) -> Self {
        Self::new(name, 0.0001, 1000.0)
    }

    pub fn with_rounding(mut self, rounding: VolumeRounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_volume_bounds(mut self, min_volume: f64, max_volume: f64) -> Self {
        self.min_volume = min_volume;
        self.max_volume = max_volume;
        self
    }

    /// Snap a raw volume to the step using this symbol's rounding mode, then
    /// clamp into `[min_volume, max_volume]`.
    pub fn normalize_volume(&self, volume: f64) -> f64 {
        let steps = volume / self.volume_step;
        let rounded_steps = match self.rounding {
            VolumeRounding::ToNearest => steps.round(),
            VolumeRounding::Down => steps.floor(),
            VolumeRounding::Up => steps.ceil(),
        };
        (rounded_steps * self.volume_step).clamp(self.min_volume, self.max_volume)
    }

    /// Convert a price distance to pips.
    pub fn to_pips(&self, price_distance: f64) -> f64 {
        price_distance / self.pip_size
    }

    /// Convert a pip count to a price distance.
    pub fn from_pips(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pip_size.is_nan() || self.pip_size <= 0.0 {
            return Err(format!("pip_size must be > 0, got {}", self.pip_size));
        }
        if self.volume_step.is_nan() || self.volume_step <= 0.0 {
            return Err(format!("volume_step must be > 0, got {}", self.volume_step));
        }
        for (field, value) in [("min_volume", self.min_volume), ("max_volume", self.max_volume)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{field} must be finite and >= 0, got {value}"));
            }
        }
        if self.min_volume > self.max_volume {
            return Err(format!(
                "min_volume {} exceeds max_volume {}",
                self.min_volume, self.max_volume
            ));
        }
        Ok(())
    }
}
