//! Strategy configuration: which classifier frame, composer rule set and
//! sizing policy a decision core runs with.
//!
//! - `StrategyConfig`: the full, serde/TOML-loadable configuration.
//! - `StopDistance` / `EntryKind`: order geometry.
//! - `StrategyPreset`: named configurations of the known strategy variants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::composer::{EntryRule, ExitRule, StopRatchet, TimingGate, VolatilityGate};
use crate::domain::{SeriesKey, SeriesView, SymbolInfo, Timeframe};
use crate::error::{ConfigError, CoreError};
use crate::sizing::SizingPolicy;

// ─── Order geometry ─────────────────────────────────────────────────

/// Stop-loss or take-profit distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopDistance {
    Fixed { pips: f64 },
    /// `multiplier` × the last completed ATR, in whole pips.
    AtrMultiple { multiplier: f64 },
}

impl StopDistance {
    /// Distance in pips for this cycle.
    pub fn resolve<V: SeriesView + ?Sized>(&self, view: &V, symbol: &SymbolInfo) -> Result<f64, CoreError> {
        match *self {
            Self::Fixed { pips } => Ok(pips),
            Self::AtrMultiple { multiplier } => {
                let atr_pips = symbol.to_pips(view.last(SeriesKey::Atr)?).round();
                Ok((atr_pips * multiplier).round())
            }
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let value = match *self {
            Self::Fixed { pips } => pips,
            Self::AtrMultiple { multiplier } => multiplier,
        };
        if value.is_nan() || value <= 0.0 {
            return Err(ConfigError::Invalid(format!("{field} distance must be > 0, got {value}")));
        }
        Ok(())
    }
}

/// How an entry reaches the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// Fill now at the side-appropriate quote.
    #[default]
    Market,
    /// Stop order at the signal bar's high (long) or low (short). Expires at
    /// the midnight UTC opening the day of `cycle time + expiry_hours`, see
    /// [`crate::driver::stop_order_expiry`].
    StopAtSignalBar { expiry_hours: u32 },
}

// ─── StrategyConfig ─────────────────────────────────────────────────

/// Complete configuration of one decision core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Order label. Positions whose label up to the first `,` equals it are ours.
    pub label: String,
    /// Working ("local") timeframe.
    pub timeframe: Timeframe,
    /// Overrides the static reference table when set.
    #[serde(default)]
    pub reference_timeframe: Option<Timeframe>,
    pub gate: TimingGate,
    pub entry: EntryRule,
    #[serde(default)]
    pub volatility: Option<VolatilityGate>,
    #[serde(default)]
    pub exit: ExitRule,
    #[serde(default)]
    pub ratchet: Option<StopRatchet>,
    #[serde(default)]
    pub stop_loss: Option<StopDistance>,
    #[serde(default)]
    pub take_profit: Option<StopDistance>,
    #[serde(default)]
    pub entry_kind: EntryKind,
    pub sizing: SizingPolicy,
}

impl StrategyConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Timeframe the reference timing code is computed on.
    pub fn reference_timeframe(&self) -> Timeframe {
        self.reference_timeframe
            .unwrap_or_else(|| self.timeframe.reference())
    }

    /// Every series the core may read on each frame: `(local, reference)`.
    pub fn required_series(&self) -> (Vec<SeriesKey>, Vec<SeriesKey>) {
        let timing_keys = [
            SeriesKey::Close,
            SeriesKey::TrendMa,
            SeriesKey::MacdHistogram,
            SeriesKey::MacdSignal,
        ];
        let mut local: Vec<SeriesKey> = timing_keys.to_vec();
        local.extend_from_slice(self.entry.required_series());
        local.extend_from_slice(self.exit.required_series());
        let atr_needed = self.volatility.is_some()
            || matches!(self.stop_loss, Some(StopDistance::AtrMultiple { .. }))
            || matches!(self.take_profit, Some(StopDistance::AtrMultiple { .. }));
        if atr_needed {
            local.push(SeriesKey::Atr);
        }
        if matches!(self.entry_kind, EntryKind::StopAtSignalBar { .. }) {
            local.extend([SeriesKey::High, SeriesKey::Low]);
        }
        local.sort_by_key(|k| k.as_str());
        local.dedup();
        (local, timing_keys.to_vec())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.trim().is_empty() {
            return Err(ConfigError::Invalid("label must not be empty".into()));
        }
        if self.label.contains(',') {
            return Err(ConfigError::Invalid(format!(
                "label '{}' must not contain ','",
                self.label
            )));
        }
        self.gate.validate().map_err(ConfigError::Invalid)?;
        self.entry.validate().map_err(ConfigError::Invalid)?;
        self.exit.validate().map_err(ConfigError::Invalid)?;
        if let Some(gate) = &self.volatility {
            gate.validate().map_err(ConfigError::Invalid)?;
        }
        if let Some(ratchet) = &self.ratchet {
            ratchet.validate().map_err(ConfigError::Invalid)?;
        }
        if let Some(sl) = &self.stop_loss {
            sl.validate("stop_loss")?;
        }
        if let Some(tp) = &self.take_profit {
            tp.validate("take_profit")?;
        }
        if let EntryKind::StopAtSignalBar { expiry_hours: 0 } = self.entry_kind {
            return Err(ConfigError::Invalid("expiry_hours must be >= 1".into()));
        }
        self.sizing.validate().map_err(ConfigError::Invalid)?;
        if matches!(self.sizing, SizingPolicy::RiskBased { .. }) && self.stop_loss.is_none() {
            return Err(ConfigError::Invalid(
                "risk-based sizing requires a stop_loss distance".into(),
            ));
        }
        Ok(())
    }

    /// Deterministic BLAKE3 digest (hex) of the canonical JSON form.
    ///
    /// Field order is fixed by the struct, so equal configs hash equally.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

// ─── StrategyPreset ─────────────────────────────────────────────────

/// Named configurations of the known strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyPreset {
    /// EMA cross + stochastic extreme, confirmed reference timing, ATR gate.
    EmaStochastic,
    /// RSI re-entry from the 30/70 bands, closed at the opposite band.
    RsiReversal,
    /// Stochastic %K/%D cross in the extreme band, closed at target or MA flip.
    StochasticSwing,
    /// RSI extreme with local trend, profit-lock ratchet.
    RsiExtreme,
    /// Deep MACD cross on strict reference timing, ATR-scaled stop.
    MacdCross,
    /// Close crossing the trend MA, entered by stop order at the signal bar.
    MaBreakout,
    /// Stacked-MA pullback confirmed by a deep MACD cross, linear step sizing.
    TrendStack,
}

impl StrategyPreset {
    pub fn name(self) -> &'static str {
        match self {
            Self::EmaStochastic => "ema_stochastic",
            Self::RsiReversal => "rsi_reversal",
            Self::StochasticSwing => "stochastic_swing",
            Self::RsiExtreme => "rsi_extreme",
            Self::MacdCross => "macd_cross",
            Self::MaBreakout => "ma_breakout",
            Self::TrendStack => "trend_stack",
        }
    }

    pub fn to_config(self) -> StrategyConfig {
        match self {
            Self::EmaStochastic => StrategyConfig {
                label: "scalper".into(),
                timeframe: Timeframe::Minute5,
                reference_timeframe: None,
                gate: TimingGate::confirmed(),
                entry: EntryRule::ma_cross_stochastic(),
                volatility: Some(VolatilityGate::new(0.0002)),
                exit: ExitRule::None,
                ratchet: None,
                stop_loss: Some(StopDistance::Fixed { pips: 30.0 }),
                take_profit: Some(StopDistance::Fixed { pips: 10.0 }),
                entry_kind: EntryKind::Market,
                sizing: SizingPolicy::RiskBased { risk_percent: 1.0 },
            },
            Self::RsiReversal => StrategyConfig {
                label: "scalper".into(),
                timeframe: Timeframe::Hour,
                reference_timeframe: None,
                gate: TimingGate::extended(),
                entry: EntryRule::rsi_band_reentry(),
                volatility: None,
                exit: ExitRule::rsi_target(),
                ratchet: None,
                stop_loss: None,
                take_profit: None,
                entry_kind: EntryKind::Market,
                sizing: SizingPolicy::Fixed { volume: 10_000.0 },
            },
            Self::StochasticSwing => StrategyConfig {
                label: "scalperv7".into(),
                timeframe: Timeframe::Hour,
                reference_timeframe: None,
                gate: TimingGate::extended(),
                entry: EntryRule::stochastic_cross(),
                volatility: None,
                exit: ExitRule::stochastic_target(),
                ratchet: None,
                stop_loss: None,
                take_profit: None,
                entry_kind: EntryKind::Market,
                sizing: SizingPolicy::Fixed { volume: 50_000.0 },
            },
            Self::RsiExtreme => StrategyConfig {
                label: "scalper".into(),
                timeframe: Timeframe::Minute5,
                reference_timeframe: None,
                gate: TimingGate::confirmed(),
                entry: EntryRule::rsi_extreme(),
                volatility: Some(VolatilityGate::new(0.0003)),
                exit: ExitRule::None,
                ratchet: Some(StopRatchet::default_params()),
                stop_loss: Some(StopDistance::Fixed { pips: 30.0 }),
                take_profit: Some(StopDistance::Fixed { pips: 10.0 }),
                entry_kind: EntryKind::Market,
                sizing: SizingPolicy::RiskBased { risk_percent: 2.0 },
            },
            Self::MacdCross => StrategyConfig {
                label: "scalper".into(),
                timeframe: Timeframe::Hour,
                reference_timeframe: None,
                gate: TimingGate::strict(),
                entry: EntryRule::macd_cross(),
                volatility: Some(VolatilityGate::new(0.0004)),
                exit: ExitRule::macd_reversal(),
                ratchet: None,
                stop_loss: Some(StopDistance::AtrMultiple { multiplier: 1.0 }),
                take_profit: None,
                entry_kind: EntryKind::Market,
                sizing: SizingPolicy::RiskBased { risk_percent: 1.0 },
            },
            Self::MaBreakout => StrategyConfig {
                label: "scalperv8".into(),
                timeframe: Timeframe::Hour,
                reference_timeframe: Some(Timeframe::Day2),
                gate: TimingGate::open(),
                entry: EntryRule::close_crosses_ma(),
                volatility: None,
                exit: ExitRule::None,
                ratchet: None,
                stop_loss: Some(StopDistance::Fixed { pips: 40.0 }),
                take_profit: Some(StopDistance::Fixed { pips: 80.0 }),
                entry_kind: EntryKind::StopAtSignalBar { expiry_hours: 8 },
                sizing: SizingPolicy::RiskBased { risk_percent: 1.0 },
            },
            Self::TrendStack => StrategyConfig {
                label: "scalper".into(),
                timeframe: Timeframe::Hour,
                reference_timeframe: None,
                gate: TimingGate::open(),
                entry: EntryRule::trend_stack_macd(),
                volatility: None,
                exit: ExitRule::trend_reversal(),
                ratchet: None,
                stop_loss: Some(StopDistance::Fixed { pips: 10.0 }),
                take_profit: Some(StopDistance::Fixed { pips: 10.0 }),
                entry_kind: EntryKind::Market,
                sizing: SizingPolicy::LinearStep {
                    base_volume: 10_000.0,
                    step: 10_000.0,
                },
            },
        }
    }

    pub fn all() -> &'static [StrategyPreset] {
        &[
            Self::EmaStochastic,
            Self::RsiReversal,
            Self::StochasticSwing,
            Self::RsiExtreme,
            Self::MacdCross,
            Self::MaBreakout,
            Self::TrendStack,
        ]
    }
}

impl fmt::Display for StrategyPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
