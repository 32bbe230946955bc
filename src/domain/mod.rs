//! Domain Types
//!
//! Snapshots published on the event bus and the dashboard configuration.

pub mod config;
pub mod time;
pub mod weather;

pub use config::*;
pub use time::*;
pub use weather::*;
