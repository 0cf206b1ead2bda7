//! Periodic pointer nudge while the toggle is running.

use crate::cursor::Position;
use std::time::Duration;

/// Horizontal wiggle that alternates direction every tick, so the pointer
/// stays around where the user left it.
#[derive(Debug, Clone)]
pub struct KeepAlive {
    interval: Duration,
    step: i32,
    rightward: bool,
}

impl KeepAlive {
    pub fn new(interval: Duration, step: i32) -> Self {
        Self {
            interval,
            step,
            rightward: true,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_target(&mut self, from: Position) -> Position {
        let dx = if self.rightward { self.step } else { -self.step };
        self.rightward = !self.rightward;
        from.offset(dx, 0)
    }
}
