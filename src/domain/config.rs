//! Config - Dashboard Configuration
//!
//! Loaded from `dashboard.toml` in the platform config directory. Every
//! section and field is optional; missing values fall back to the defaults
//! below.

use crate::constants::{
    BIGDATACLOUD_BASE_URL, FALLBACK_LATITUDE, FALLBACK_LOCATION_NAME, FALLBACK_LONGITUDE,
    FALLBACK_TIME_ZONE, LOCATION_MAX_AGE_SECS, LOOKUP_LANGUAGE, OPEN_METEO_BASE_URL,
    REQUEST_TIMEOUT_SECS, TIME_GEOLOCATION_TIMEOUT_MS, TIME_TICK_INTERVAL_MS,
    WEATHER_GEOLOCATION_TIMEOUT_MS,
};
use crate::error::Result;
use crate::helpers::get_or_create_config_dir;
use crate::services::Coordinate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Device position
    pub location: LocationConfig,
    /// Clock settings
    pub time: TimeSettings,
    /// Weather settings
    pub weather: WeatherSettings,
    /// External API settings
    pub api: ApiSettings,
}

/// Device position. Without a coordinate, geolocation is reported unsupported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Oldest location fix that may be reused
    pub max_age_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            max_age_secs: LOCATION_MAX_AGE_SECS,
        }
    }
}

impl LocationConfig {
    /// Configured coordinate, if both halves are present
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinate::new(latitude, longitude)),
            _ => None,
        }
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

/// Clock settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeSettings {
    pub tick_interval_ms: u64,
    /// Used when the system zone cannot be determined
    pub fallback_time_zone: String,
    pub geolocation_timeout_ms: u64,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: TIME_TICK_INTERVAL_MS,
            fallback_time_zone: FALLBACK_TIME_ZONE.to_string(),
            geolocation_timeout_ms: TIME_GEOLOCATION_TIMEOUT_MS,
        }
    }
}

/// Weather settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeatherSettings {
    pub fallback_latitude: f64,
    pub fallback_longitude: f64,
    pub fallback_label: String,
    pub geolocation_timeout_ms: u64,
    /// Periodic refresh (0 = fetch once at startup)
    pub refresh_interval_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            fallback_latitude: FALLBACK_LATITUDE,
            fallback_longitude: FALLBACK_LONGITUDE,
            fallback_label: FALLBACK_LOCATION_NAME.to_string(),
            geolocation_timeout_ms: WEATHER_GEOLOCATION_TIMEOUT_MS,
            refresh_interval_secs: 0,
        }
    }
}

impl WeatherSettings {
    pub fn fallback(&self) -> Coordinate {
        Coordinate::new(self.fallback_latitude, self.fallback_longitude)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

/// External API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    /// Timezone lookup and reverse geocoding
    pub bigdatacloud_url: String,
    /// Forecast
    pub open_meteo_url: String,
    pub language: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bigdatacloud_url: BIGDATACLOUD_BASE_URL.to_string(),
            open_meteo_url: OPEN_METEO_BASE_URL.to_string(),
            language: LOOKUP_LANGUAGE.to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn get_config_path() -> Result<PathBuf> {
    let config_dir = get_or_create_config_dir()?;
    let path = config_dir.join("dashboard.toml");
    if !path.exists() {
        std::fs::write(&path, "")?;
    }
    Ok(path)
}

impl DashboardConfig {
    /// Load from the platform config directory, creating an empty file on first run
    pub fn try_load() -> Result<Self> {
        let path = get_config_path()?;
        Self::load_from(&path)
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        info!(path = ?path, "Loading config file");
        let value = std::fs::read_to_string(path)?;
        Self::parse(&value)
    }

    /// Parse TOML text; an empty document yields the defaults
    pub fn parse(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(value)?)
    }
}
