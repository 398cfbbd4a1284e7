//! Exit rules for an open position. Independent of the entry gate.

use serde::{Deserialize, Serialize};

use crate::domain::{SeriesKey, SeriesView, Side};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ExitRule {
    /// Leave the position to its stop loss and take profit.
    #[default]
    None,
    /// Close a long once RSI reaches `long_exit`, a short once it falls to `short_exit`.
    RsiTarget { long_exit: f64, short_exit: f64 },
    /// Close on a %K target, or when the fast MA crossed against the position
    /// within `reversal_within` bars and is still on the wrong side.
    StochasticTarget {
        long_exit: f64,
        short_exit: f64,
        reversal_within: usize,
    },
    /// Close when MACD crosses its signal line against the position.
    MacdReversal { within: usize },
    /// Close when MACD crossed against the position within `within` bars
    /// while the slow/trend MA pair still favors it, or when the trigger MA
    /// crossed the slow MA against the position on the last bar.
    TrendReversal { within: usize },
}

impl ExitRule {
    pub fn rsi_target() -> Self {
        Self::RsiTarget {
            long_exit: 70.0,
            short_exit: 30.0,
        }
    }

    pub fn stochastic_target() -> Self {
        Self::StochasticTarget {
            long_exit: 80.0,
            short_exit: 20.0,
            reversal_within: 2,
        }
    }

    pub fn macd_reversal() -> Self {
        Self::MacdReversal { within: 1 }
    }

    pub fn trend_reversal() -> Self {
        Self::TrendReversal { within: 1 }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::RsiTarget { .. } => "rsi_target",
            Self::StochasticTarget { .. } => "stochastic_target",
            Self::MacdReversal { .. } => "macd_reversal",
            Self::TrendReversal { .. } => "trend_reversal",
        }
    }

    pub fn required_series(&self) -> &'static [SeriesKey] {
        use SeriesKey::*;
        match self {
            Self::None => &[],
            Self::RsiTarget { .. } => &[Rsi],
            Self::StochasticTarget { .. } => &[StochK, FastMa, SlowMa],
            Self::MacdReversal { .. } => &[Macd, MacdSignal],
            Self::TrendReversal { .. } => &[SlowMa, TrendMa, Macd, MacdSignal, TriggerMa],
        }
    }

    /// True if a position on `side` should be closed now.
    pub fn should_close<V: SeriesView + ?Sized>(&self, side: Side, view: &V) -> Result<bool, CoreError> {
        use SeriesKey::*;
        match *self {
            Self::None => Ok(false),

            Self::RsiTarget {
                long_exit,
                short_exit,
            } => {
                let rsi = view.last(Rsi)?;
                Ok(match side {
                    Side::Long => rsi >= long_exit,
                    Side::Short => rsi <= short_exit,
                })
            }

            Self::StochasticTarget {
                long_exit,
                short_exit,
                reversal_within,
            } => {
                let k = view.last(StochK)?;
                let target = match side {
                    Side::Long => k >= long_exit,
                    Side::Short => k <= short_exit,
                };
                if target {
                    return Ok(true);
                }
                let fast = view.last(FastMa)?;
                let slow = view.last(SlowMa)?;
                Ok(match side {
                    Side::Long => view.crossed_below(FastMa, SlowMa, reversal_within)? && fast < slow,
                    Side::Short => view.crossed_above(FastMa, SlowMa, reversal_within)? && fast > slow,
                })
            }

            Self::MacdReversal { within } => match side {
                Side::Long => view.crossed_below(Macd, MacdSignal, within),
                Side::Short => view.crossed_above(Macd, MacdSignal, within),
            },

            Self::TrendReversal { within } => {
                let slow = view.last(SlowMa)?;
                let trend = view.last(TrendMa)?;
                Ok(match side {
                    Side::Long => {
                        (slow > trend && view.crossed_below(Macd, MacdSignal, within)?)
                            || view.crossed_below(TriggerMa, SlowMa, 0)?
                    }
                    Side::Short => {
                        (slow < trend && view.crossed_above(Macd, MacdSignal, within)?)
                            || view.crossed_above(TriggerMa, SlowMa, 0)?
                    }
                })
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::RsiTarget {
                long_exit,
                short_exit,
            }
            | Self::StochasticTarget {
                long_exit,
                short_exit,
                ..
            } => {
                if !(0.0..=100.0).contains(&long_exit) || !(0.0..=100.0).contains(&short_exit) {
                    return Err(format!(
                        "exit levels must be within 0..=100, got long {long_exit} short {short_exit}"
                    ));
                }
                Ok(())
            }
            Self::None | Self::MacdReversal { .. } | Self::TrendReversal { .. } => Ok(()),
        }
    }
}
