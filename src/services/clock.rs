//! Wall Clock
//!
//! Source of the current instant. Swapped for a fake in tests.

use jiff::Timestamp;

pub trait WallClock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The operating system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
