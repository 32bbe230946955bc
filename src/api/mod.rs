//! External API Layer
//!
//! Lookup services used by the time and weather services, expressed as
//! traits so the services never see HTTP.
//!
//! ```text
//! TimeService ────▶ TimezoneLookup ──┐
//!                                    ├──▶ BigDataCloud ──┐
//! WeatherService ─▶ ReverseGeocoder ─┘                   ├──▶ ApiClient (reqwest)
//!               └─▶ ForecastSource ────▶ OpenMeteo ──────┘
//! ```

mod bigdatacloud;
mod client;
mod open_meteo;

pub use bigdatacloud::*;
pub use client::*;
pub use open_meteo::*;

use crate::domain::Readings;
use crate::error::Result;
use crate::services::Coordinate;
use async_trait::async_trait;

/// Resolves the IANA time zone at a coordinate
#[async_trait]
pub trait TimezoneLookup: Send + Sync {
    /// IANA identifier (e.g., "Europe/Berlin"); may be empty when unknown
    async fn time_zone_for(&self, at: Coordinate, language: &str) -> Result<String>;
}

/// Resolves a human-readable place name at a coordinate
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn place_name(&self, at: Coordinate, language: &str) -> Result<Option<String>>;
}

/// Current conditions and daily forecast at a coordinate
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn forecast(&self, at: Coordinate) -> Result<Readings>;
}
