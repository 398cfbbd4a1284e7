//! Consecutive-loss memory for the sizer.

use std::collections::VecDeque;

use crate::domain::{PositionClosed, PositionId};

/// Loss-streak counter. Never below 1.
///
/// A losing close adds one; a flat or winning close removes one (floored at 1).
/// A duplicated close notification for one of the last [`Self::SETTLED_WINDOW`]
/// settled ids leaves the counter untouched. Older ids are forgotten; the
/// driver only forwards closes of positions it saw open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossStreak {
    count: u32,
    settled: VecDeque<PositionId>,
}

impl Default for LossStreak {
    fn default() -> Self {
        Self::new()
    }
}

impl LossStreak {
    pub const FLOOR: u32 = 1;
    pub const SETTLED_WINDOW: usize = 64;

    pub fn new() -> Self {
        Self {
            count: Self::FLOOR,
            settled: VecDeque::with_capacity(Self::SETTLED_WINDOW),
        }
    }

    /// Counter resumed at `count` (clamped to the floor).
    pub fn starting_at(count: u32) -> Self {
        Self {
            count: count.max(Self::FLOOR),
            settled: VecDeque::with_capacity(Self::SETTLED_WINDOW),
        }
    }

    pub fn get(&self) -> u32 {
        self.count
    }

    /// Apply a close notification. Returns `false` if this id was already settled.
    pub fn record(&mut self, closed: &PositionClosed) -> bool {
        if self.settled.contains(&closed.id) {
            return false;
        }
        if self.settled.len() == Self::SETTLED_WINDOW {
            self.settled.pop_front();
        }
        self.settled.push_back(closed.id);
        if closed.gross_profit < 0.0 {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = self.count.saturating_sub(1).max(Self::FLOOR);
        }
        true
    }

    pub fn is_settled(&self, id: PositionId) -> bool {
        self.settled.contains(&id)
    }
}
