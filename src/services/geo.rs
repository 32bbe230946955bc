//! Geolocation
//!
//! Position providers consumed by the time and weather services. Callers go
//! through [`locate`], which bounds every request by its timeout.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::time::Duration;
use tokio::time::Instant;

/// A WGS84 coordinate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Options for a single position request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionOptions {
    /// Give up after this long
    pub timeout: Duration,
    /// Oldest cached fix that is still acceptable
    pub maximum_age: Duration,
    /// Request a precise fix (slower)
    pub high_accuracy: bool,
}

impl PositionOptions {
    /// Low-accuracy request with the given timeout and fix age
    pub fn new(timeout: Duration, maximum_age: Duration) -> Self {
        Self {
            timeout,
            maximum_age,
            high_accuracy: false,
        }
    }
}

/// Why no position could be obtained
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum GeolocationError {
    /// No geolocation capability on this device
    #[snafu(display("geolocation is not supported"))]
    Unsupported,

    /// The user refused access
    #[snafu(display("geolocation permission denied"))]
    PermissionDenied,

    /// The provider failed to determine a position
    #[snafu(display("position unavailable: {message}"))]
    Unavailable { message: String },

    /// No answer within the timeout
    #[snafu(display("geolocation timed out after {after_ms}ms"))]
    Timeout { after_ms: u64 },
}

/// Source of the device position
#[async_trait]
pub trait Geolocation: Send + Sync {
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError>;
}

/// Request a position, bounded by `options.timeout`
pub async fn locate(
    provider: &dyn Geolocation,
    options: PositionOptions,
) -> Result<Coordinate, GeolocationError> {
    match tokio::time::timeout(options.timeout, provider.current_position(options)).await {
        Ok(result) => result,
        Err(_) => Err(GeolocationError::Timeout {
            after_ms: options.timeout.as_millis() as u64,
        }),
    }
}

/// Position taken from the configuration file
#[derive(Clone, Debug, Default)]
pub struct ConfiguredGeolocation {
    coordinate: Option<Coordinate>,
}

impl ConfiguredGeolocation {
    pub fn new(coordinate: Option<Coordinate>) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl Geolocation for ConfiguredGeolocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        self.coordinate.ok_or(GeolocationError::Unsupported)
    }
}

/// Reuses the last fix while it is younger than the requested maximum age
pub struct FixCache<G> {
    inner: G,
    last_fix: Mutex<Option<(Instant, Coordinate)>>,
}

impl<G: Geolocation> FixCache<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, maximum_age: Duration) -> Option<Coordinate> {
        let last_fix = *self.last_fix.lock();
        last_fix
            .filter(|(taken_at, _)| taken_at.elapsed() <= maximum_age)
            .map(|(_, coordinate)| coordinate)
    }
}

#[async_trait]
impl<G: Geolocation> Geolocation for FixCache<G> {
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        if let Some(coordinate) = self.cached(options.maximum_age) {
            tracing::debug!(%coordinate, "Reusing cached location fix");
            return Ok(coordinate);
        }

        let coordinate = self.inner.current_position(options).await?;
        *self.last_fix.lock() = Some((Instant::now(), coordinate));
        Ok(coordinate)
    }
}

impl<G> std::fmt::Debug for FixCache<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixCache")
            .field("last_fix", &(*self.last_fix.lock()).map(|(_, c)| c))
            .finish()
    }
}
