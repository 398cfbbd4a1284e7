//! Error types for the decision core.
//!
//! `CoreError` is the per-cycle taxonomy: every variant is recoverable by
//! skipping the cycle. `ConfigError` is raised only while building a strategy.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while evaluating a single decision cycle.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreError {
    /// A required series has not produced a valid value yet (NaN at the index).
    #[error("warm-up incomplete: '{series}' has no value {bars_back} bar(s) back")]
    WarmupIncomplete { series: String, bars_back: usize },

    /// The requested lookback is beyond the available history, or the series is missing.
    #[error("series '{series}' unavailable at {bars_back} bar(s) back ({available} bar(s) available)")]
    SeriesUnavailable {
        series: String,
        bars_back: usize,
        available: usize,
    },

    /// Degenerate sizing input (zero stop distance, zero price, non-positive balance).
    #[error("invalid sizing input: {0}")]
    InvalidSizingInput(String),
}

impl CoreError {
    /// True if the cycle can be skipped and evaluation resumed on the next bar.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::WarmupIncomplete { .. }
                | Self::SeriesUnavailable { .. }
                | Self::InvalidSizingInput(_)
        )
    }

    /// True for the two "not enough history" variants.
    pub fn is_warmup(&self) -> bool {
        matches!(
            self,
            Self::WarmupIncomplete { .. } | Self::SeriesUnavailable { .. }
        )
    }
}

/// Errors raised while loading or validating a strategy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("invalid timing code {0}: must be one of -4..=-1 or 1..=4")]
    InvalidTimingCode(i8),

    #[error("invalid config: {0}")]
    Invalid(String),
}
