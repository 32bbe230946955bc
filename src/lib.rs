//! Dashboard Core Library
//!
//! Shared clock and weather feeds for a personal dashboard. Services publish
//! onto a typed event bus with per-channel caching and change deduplication;
//! widgets subscribe, get the cached value right away and unsubscribe on
//! teardown.

pub mod api;
pub mod constants;
pub mod domain;
pub mod error;
pub mod helpers;
pub mod services;
pub mod widgets;
