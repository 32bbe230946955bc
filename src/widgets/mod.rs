//! Widgets
//!
//! Headless view models. Each widget subscribes on mount, keeps the latest
//! values it has seen and unsubscribes when unmounted or dropped.

mod clock;
mod weather;

pub use clock::*;
pub use weather::*;
