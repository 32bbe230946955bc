//! Service Constants
//!
//! Centralized defaults shared by the time and weather services.

/// Time service tick period
pub const TIME_TICK_INTERVAL_MS: u64 = 1000;

/// Time zone used when the system zone cannot be determined
pub const FALLBACK_TIME_ZONE: &str = "Europe/Tallinn";

/// Geolocation timeouts
pub const TIME_GEOLOCATION_TIMEOUT_MS: u64 = 5000;
pub const WEATHER_GEOLOCATION_TIMEOUT_MS: u64 = 10_000;

/// Oldest location fix that may be reused (5 minutes)
pub const LOCATION_MAX_AGE_SECS: u64 = 300;

/// Weather fallback location (Berlin)
pub const FALLBACK_LATITUDE: f64 = 52.52;
pub const FALLBACK_LONGITUDE: f64 = 13.41;
pub const FALLBACK_LOCATION_NAME: &str = "Berlin";

/// Label used when reverse geocoding yields nothing
pub const UNKNOWN_LOCATION_LABEL: &str = "Your Location";

/// Status message published when the forecast cannot be fetched
pub const WEATHER_FETCH_ERROR: &str = "Failed to fetch weather data";

/// Number of forecast days after today
pub const FORECAST_DAYS: usize = 3;

/// Visibility in km (not provided by the forecast source)
pub const DEFAULT_VISIBILITY_KM: u32 = 10;

/// Language requested from lookup services
pub const LOOKUP_LANGUAGE: &str = "en";

/// External API endpoints
pub const BIGDATACLOUD_BASE_URL: &str = "https://api.bigdatacloud.net";
pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com";
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
