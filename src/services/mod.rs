//! Service Layer
//!
//! Background services publish onto a shared [`EventBus`]; widgets only ever
//! subscribe.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ServiceHub                             │
//! │  ┌─────────────┐  ┌──────────────┐  ┌──────────────────┐    │
//! │  │ TimeService │  │WeatherService│  │   Collaborators  │    │
//! │  │  (1s tick)  │  │  (on demand) │  │ (geo, APIs, clock)│   │
//! │  └─────────────┘  └──────────────┘  └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼ time.update / weather.update / weather.state
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EventBus                             │
//! │                  (cache, dedup, replay)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!                   ClockWidget, WeatherWidget
//! ```

mod bus;
mod channels;
mod clock;
mod geo;
mod hub;
mod time;
mod weather;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::*;
pub use channels::*;
pub use clock::*;
pub use geo::*;
pub use hub::*;
pub use time::*;
pub use weather::*;
