//! Adaptive Risk Sizer: turns balance, risk and loss streak into a trade volume.
//!
//! Sizers decide *how much*, never *whether*. Every policy's raw volume is
//! snapped to the symbol's volume step and clamped into its volume bounds.

pub mod loss_streak;

pub use loss_streak::LossStreak;

use serde::{Deserialize, Serialize};

use crate::domain::SymbolInfo;
use crate::error::CoreError;

/// Inputs for one sizing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingRequest {
    pub balance: f64,
    /// Side-appropriate quote (ask to buy, bid to sell).
    pub entry_price: f64,
    /// Stop-loss distance in pips, if the order carries one.
    pub stop_loss_pips: Option<f64>,
    pub loss_streak: u32,
}

/// Volume policy, selected per strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Risk `risk_percent` of balance over the stop distance. Ignores the streak.
    ///
    /// ```text
    /// risked = balance * risk_percent / 100
    /// volume = risked / (entry_price * pip_size * stop_loss_pips)
    /// ```
    RiskBased { risk_percent: f64 },
    /// `base_volume * 2^(streak - 1)`: doubles after every extra loss.
    Doubling { base_volume: f64 },
    /// Constant volume.
    Fixed { volume: f64 },
    /// `base_volume` at streak 1, otherwise `base_volume + step * streak`.
    LinearStep { base_volume: f64, step: f64 },
}

impl SizingPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RiskBased { .. } => "risk_based",
            Self::Doubling { .. } => "doubling",
            Self::Fixed { .. } => "fixed",
            Self::LinearStep { .. } => "linear_step",
        }
    }

    /// Normalized trade volume.
    ///
    /// Every policy rejects a non-positive entry price or stop distance. A
    /// missing stop is only an error for risk-based sizing.
    pub fn size(&self, request: &SizingRequest, symbol: &SymbolInfo) -> Result<f64, CoreError> {
        check_order_inputs(request)?;
        let raw = match *self {
            Self::RiskBased { risk_percent } => {
                risk_based_volume(request, risk_percent, symbol.pip_size)?
            }
            Self::Doubling { base_volume } => {
                let doublings = request.loss_streak.max(1) - 1;
                base_volume * 2f64.powi(doublings.min(i32::MAX as u32) as i32)
            }
            Self::Fixed { volume } => volume,
            Self::LinearStep { base_volume, step } => {
                if request.loss_streak <= 1 {
                    base_volume
                } else {
                    base_volume + step * f64::from(request.loss_streak)
                }
            }
        };
        Ok(symbol.normalize_volume(raw))
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::RiskBased { risk_percent } => {
                if risk_percent.is_nan() || risk_percent <= 0.0 || risk_percent > 100.0 {
                    return Err(format!("risk_percent must be in (0, 100], got {risk_percent}"));
                }
            }
            Self::Doubling { base_volume } | Self::LinearStep { base_volume, .. } => {
                positive("base_volume", base_volume)?;
            }
            Self::Fixed { volume } => positive("volume", volume)?,
        }
        if let Self::LinearStep { step, .. } = *self {
            if step.is_nan() || step < 0.0 {
                return Err(format!("step must be >= 0, got {step}"));
            }
        }
        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<(), String> {
    if value.is_nan() || value <= 0.0 {
        return Err(format!("{field} must be > 0, got {value}"));
    }
    Ok(())
}

fn check_order_inputs(request: &SizingRequest) -> Result<(), CoreError> {
    if request.entry_price.is_nan() || request.entry_price <= 0.0 {
        return Err(CoreError::InvalidSizingInput(format!(
            "entry price must be > 0, got {}",
            request.entry_price
        )));
    }
    if let Some(stop_pips) = request.stop_loss_pips {
        if stop_pips.is_nan() || stop_pips <= 0.0 {
            return Err(CoreError::InvalidSizingInput(format!(
                "stop-loss distance must be > 0 pips, got {stop_pips}"
            )));
        }
    }
    Ok(())
}

fn risk_based_volume(request: &SizingRequest, risk_percent: f64, pip_size: f64) -> Result<f64, CoreError> {
    let stop_pips = request.stop_loss_pips.ok_or_else(|| {
        CoreError::InvalidSizingInput("risk-based sizing needs a stop-loss distance".into())
    })?;
    if request.balance.is_nan() || request.balance <= 0.0 {
        return Err(CoreError::InvalidSizingInput(format!(
            "balance must be > 0, got {}",
            request.balance
        )));
    }

    let risked = request.balance * (risk_percent / 100.0);
    let volume = risked / (request.entry_price * pip_size * stop_pips);
    if !volume.is_finite() {
        return Err(CoreError::InvalidSizingInput(format!(
            "risk-based volume is not finite ({volume})"
        )));
    }
    Ok(volume)
}
