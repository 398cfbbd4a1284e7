//! Entry triggers: the oscillator/crossover event that must coincide with a
//! permitted timing code before a position is opened.
//!
//! All rules read the local timeframe's completed bars. Each rule is written
//! for the long side; the short side mirrors it.

use serde::{Deserialize, Serialize};

use crate::domain::{SeriesKey, SeriesView, Side};
use crate::error::CoreError;
use crate::timing::is_trend_up;

/// Entry trigger rule set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum EntryRule {
    /// Fast MA crossed the slow MA while both stochastic lines sit in the
    /// matching extreme band.
    MaCrossStochastic {
        cross_within: usize,
        oversold: f64,
        overbought: f64,
    },
    /// RSI re-enters from an extreme band into a narrow window.
    RsiBandReentry {
        lower: f64,
        lower_ceiling: f64,
        upper: f64,
        upper_floor: f64,
    },
    /// %K crossed %D inside an extreme band, confirmed on two bars, with the
    /// fast/slow MA pair agreeing.
    StochasticCross {
        cross_within: usize,
        oversold: f64,
        overbought: f64,
    },
    /// Local trend plus an RSI extreme plus fast/slow MA agreement.
    RsiExtreme { oversold: f64, overbought: f64 },
    /// MACD crossed its signal line on the last bar, deep below (above) zero.
    MacdCross { threshold: f64 },
    /// Close crossed the trend MA after `confirm_bars` bars on the other side.
    CloseCrossesMa { confirm_bars: usize },
    /// MA stack aligned with the trade (slow above trend for longs, and fast
    /// above slow when `full_stack`), all three MAs sloping the same way over
    /// `slope_periods`, MACD at or beyond `threshold` on the far side of zero
    /// and crossing its signal line on the last bar.
    TrendStackMacd {
        slope_periods: usize,
        threshold: f64,
        full_stack: bool,
    },
}

impl EntryRule {
    pub fn ma_cross_stochastic() -> Self {
        Self::MaCrossStochastic {
            cross_within: 1,
            oversold: 20.0,
            overbought: 80.0,
        }
    }

    pub fn rsi_band_reentry() -> Self {
        Self::RsiBandReentry {
            lower: 30.0,
            lower_ceiling: 40.0,
            upper: 70.0,
            upper_floor: 60.0,
        }
    }

    pub fn stochastic_cross() -> Self {
        Self::StochasticCross {
            cross_within: 2,
            oversold: 20.0,
            overbought: 80.0,
        }
    }

    pub fn rsi_extreme() -> Self {
        Self::RsiExtreme {
            oversold: 20.0,
            overbought: 80.0,
        }
    }

    pub fn macd_cross() -> Self {
        Self::MacdCross { threshold: 0.00025 }
    }

    pub fn close_crosses_ma() -> Self {
        Self::CloseCrossesMa { confirm_bars: 2 }
    }

    pub fn trend_stack_macd() -> Self {
        Self::TrendStackMacd {
            slope_periods: 5,
            threshold: 0.0003,
            full_stack: false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MaCrossStochastic { .. } => "ma_cross_stochastic",
            Self::RsiBandReentry { .. } => "rsi_band_reentry",
            Self::StochasticCross { .. } => "stochastic_cross",
            Self::RsiExtreme { .. } => "rsi_extreme",
            Self::MacdCross { .. } => "macd_cross",
            Self::CloseCrossesMa { .. } => "close_crosses_ma",
            Self::TrendStackMacd { .. } => "trend_stack_macd",
        }
    }

    /// Series this rule reads.
    pub fn required_series(&self) -> &'static [SeriesKey] {
        use SeriesKey::*;
        match self {
            Self::MaCrossStochastic { .. } => &[FastMa, SlowMa, StochK, StochD],
            Self::RsiBandReentry { .. } => &[Rsi],
            Self::StochasticCross { .. } => &[StochK, StochD, FastMa, SlowMa],
            Self::RsiExtreme { .. } => &[Close, TrendMa, Rsi, FastMa, SlowMa],
            Self::MacdCross { .. } => &[Macd, MacdSignal],
            Self::CloseCrossesMa { .. } => &[Close, TrendMa],
            Self::TrendStackMacd { .. } => &[FastMa, SlowMa, TrendMa, Macd, MacdSignal],
        }
    }

    /// Completed bars of history the rule needs.
    pub fn lookback_bars(&self) -> usize {
        match self {
            Self::MaCrossStochastic { cross_within, .. }
            | Self::StochasticCross { cross_within, .. } => cross_within + 2,
            Self::RsiBandReentry { .. } => 2,
            Self::RsiExtreme { .. } => 1,
            Self::MacdCross { .. } => 2,
            Self::CloseCrossesMa { confirm_bars } => confirm_bars + 1,
            Self::TrendStackMacd { slope_periods, .. } => (*slope_periods).max(2),
        }
    }

    /// True if the trigger fires for `side` on the last completed bar.
    pub fn triggers<V: SeriesView + ?Sized>(&self, side: Side, view: &V) -> Result<bool, CoreError> {
        use SeriesKey::*;
        match *self {
            Self::MaCrossStochastic {
                cross_within,
                oversold,
                overbought,
            } => {
                let k = view.last(StochK)?;
                let d = view.last(StochD)?;
                Ok(match side {
                    Side::Long => {
                        view.crossed_above(FastMa, SlowMa, cross_within)?
                            && k < oversold
                            && d < oversold
                    }
                    Side::Short => {
                        view.crossed_below(FastMa, SlowMa, cross_within)?
                            && k > overbought
                            && d > overbought
                    }
                })
            }

            Self::RsiBandReentry {
                lower,
                lower_ceiling,
                upper,
                upper_floor,
            } => {
                let now = view.value(Rsi, 0)?;
                let prior = view.value(Rsi, 1)?;
                Ok(match side {
                    Side::Long => prior <= lower && now >= lower && now < lower_ceiling,
                    Side::Short => prior >= upper && now <= upper && now > upper_floor,
                })
            }

            Self::StochasticCross {
                cross_within,
                oversold,
                overbought,
            } => {
                let (k0, k1) = (view.value(StochK, 0)?, view.value(StochK, 1)?);
                let (d0, d1) = (view.value(StochD, 0)?, view.value(StochD, 1)?);
                let fast = view.last(FastMa)?;
                let slow = view.last(SlowMa)?;
                Ok(match side {
                    Side::Long => {
                        view.crossed_above(StochK, StochD, cross_within)?
                            && [k0, k1, d0, d1].iter().all(|&v| v <= oversold)
                            && k1 > d1
                            && k0 > d0
                            && fast > slow
                    }
                    Side::Short => {
                        view.crossed_below(StochK, StochD, cross_within)?
                            && [k0, k1, d0, d1].iter().all(|&v| v >= overbought)
                            && k1 < d1
                            && k0 < d0
                            && fast < slow
                    }
                })
            }

            Self::RsiExtreme {
                oversold,
                overbought,
            } => {
                let up = is_trend_up(view.last(TrendMa)?, view.last(Close)?);
                let rsi = view.last(Rsi)?;
                let fast = view.last(FastMa)?;
                let slow = view.last(SlowMa)?;
                Ok(match side {
                    Side::Long => up && rsi < oversold && fast > slow,
                    Side::Short => !up && rsi > overbought && fast < slow,
                })
            }

            Self::MacdCross { threshold } => {
                let macd = view.last(Macd)?;
                let signal = view.last(MacdSignal)?;
                Ok(match side {
                    Side::Long => {
                        view.crossed_above(Macd, MacdSignal, 0)?
                            && macd < -threshold
                            && signal < -threshold
                    }
                    Side::Short => {
                        view.crossed_below(Macd, MacdSignal, 0)?
                            && macd > threshold
                            && signal > threshold
                    }
                })
            }

            Self::CloseCrossesMa { confirm_bars } => {
                let now_above = view.value(Close, 0)? > view.value(TrendMa, 0)?;
                let now_below = view.value(Close, 0)? < view.value(TrendMa, 0)?;
                let mut prior_above = true;
                let mut prior_below = true;
                for k in 1..=confirm_bars {
                    let close = view.value(Close, k)?;
                    let ma = view.value(TrendMa, k)?;
                    prior_below &= close < ma;
                    prior_above &= close > ma;
                }
                Ok(match side {
                    Side::Long => now_above && prior_below,
                    Side::Short => now_below && prior_above,
                })
            }

            Self::TrendStackMacd {
                slope_periods,
                threshold,
                full_stack,
            } => {
                let fast = view.last(FastMa)?;
                let slow = view.last(SlowMa)?;
                let trend = view.last(TrendMa)?;
                let macd = view.last(Macd)?;
                Ok(match side {
                    Side::Long => {
                        slow > trend
                            && (!full_stack || fast > slow)
                            && view.is_rising(FastMa, slope_periods)?
                            && view.is_rising(SlowMa, slope_periods)?
                            && view.is_rising(TrendMa, slope_periods)?
                            && macd <= -threshold
                            && view.crossed_above(Macd, MacdSignal, 0)?
                    }
                    Side::Short => {
                        slow < trend
                            && (!full_stack || fast < slow)
                            && view.is_falling(FastMa, slope_periods)?
                            && view.is_falling(SlowMa, slope_periods)?
                            && view.is_falling(TrendMa, slope_periods)?
                            && macd >= threshold
                            && view.crossed_below(Macd, MacdSignal, 0)?
                    }
                })
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::MaCrossStochastic {
                oversold,
                overbought,
                ..
            }
            | Self::StochasticCross {
                oversold,
                overbought,
                ..
            }
            | Self::RsiExtreme {
                oversold,
                overbought,
            } => check_band(oversold, overbought),
            Self::RsiBandReentry {
                lower,
                lower_ceiling,
                upper,
                upper_floor,
            } => {
                check_band(lower, upper)?;
                if !(lower < lower_ceiling && upper_floor < upper) {
                    return Err(format!(
                        "rsi band windows must be non-empty: {lower}..{lower_ceiling}, {upper_floor}..{upper}"
                    ));
                }
                Ok(())
            }
            Self::MacdCross { threshold } => {
                if threshold.is_nan() || threshold < 0.0 {
                    return Err(format!("macd threshold must be >= 0, got {threshold}"));
                }
                Ok(())
            }
            Self::CloseCrossesMa { confirm_bars } => {
                if confirm_bars == 0 {
                    return Err("confirm_bars must be >= 1".into());
                }
                Ok(())
            }
            Self::TrendStackMacd {
                slope_periods,
                threshold,
                ..
            } => {
                if slope_periods < 2 {
                    return Err(format!("slope_periods must be >= 2, got {slope_periods}"));
                }
                if threshold.is_nan() || threshold < 0.0 {
                    return Err(format!("macd threshold must be >= 0, got {threshold}"));
                }
                Ok(())
            }
        }
    }
}

fn check_band(low: f64, high: f64) -> Result<(), String> {
    if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) || low >= high {
        return Err(format!("oscillator band {low}..{high} must satisfy 0 <= low < high <= 100"));
    }
    Ok(())
}
