//! Domain types for the decision core

pub mod instrument;
pub mod market;
pub mod position;
pub mod series;
pub mod timeframe;

pub use instrument::{SymbolInfo, VolumeRounding};
pub use market::{MarketState, Quote};
pub use position::{PositionClosed, PositionEvent, PositionId, PositionOpened, Side, TrackedPosition};
pub use series::{SeriesKey, SeriesSnapshot, SeriesView};
pub use timeframe::Timeframe;
