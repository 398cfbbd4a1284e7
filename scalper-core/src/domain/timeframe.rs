//! Working timeframes and the fixed step-up table to a reference timeframe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar aggregation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Minute,
    Minute5,
    Minute15,
    Minute30,
    Hour,
    Hour4,
    Daily,
    Day2,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Coarser timeframe used for the reference timing code.
    ///
    /// This is a static lookup, not a ratio. Anything not listed maps to `Hour`.
    pub fn reference(self) -> Timeframe {
        match self {
            Timeframe::Hour => Timeframe::Daily,
            Timeframe::Minute5 => Timeframe::Hour,
            Timeframe::Daily => Timeframe::Weekly,
            Timeframe::Weekly => Timeframe::Weekly,
            _ => Timeframe::Hour,
        }
    }

    /// Short label (e.g., "h1", "d1").
    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Minute => "m1",
            Timeframe::Minute5 => "m5",
            Timeframe::Minute15 => "m15",
            Timeframe::Minute30 => "m30",
            Timeframe::Hour => "h1",
            Timeframe::Hour4 => "h4",
            Timeframe::Daily => "d1",
            Timeframe::Day2 => "d2",
            Timeframe::Weekly => "w1",
            Timeframe::Monthly => "mn1",
        }
    }

    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Minute,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Minute30,
            Timeframe::Hour,
            Timeframe::Hour4,
            Timeframe::Daily,
            Timeframe::Day2,
            Timeframe::Weekly,
            Timeframe::Monthly,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
