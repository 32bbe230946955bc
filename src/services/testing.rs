//! Test doubles for the service collaborators

use crate::api::{ForecastSource, ReverseGeocoder, TimezoneLookup};
use crate::domain::Readings;
use crate::error::{Error, Result};
use crate::services::{
    Coordinate, EventBus, Geolocation, GeolocationError, PositionOptions, WallClock,
    dashboard_bus,
};
use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub fn test_bus() -> EventBus {
    dashboard_bus()
}

fn timestamp(s: &str) -> Timestamp {
    s.parse().expect("valid timestamp")
}

/// Always reports the same instant
pub struct FixedClock(Timestamp);

impl FixedClock {
    pub fn at(s: &str) -> Self {
        Self(timestamp(s))
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Advances with the (possibly paused) tokio clock
pub struct TickingClock {
    base: Timestamp,
    started: Instant,
}

impl TickingClock {
    pub fn starting_at(s: &str) -> Self {
        Self {
            base: timestamp(s),
            started: Instant::now(),
        }
    }
}

impl WallClock for TickingClock {
    fn now(&self) -> Timestamp {
        let elapsed = SignedDuration::from_millis(self.started.elapsed().as_millis() as i64);
        self.base.checked_add(elapsed).expect("timestamp in range")
    }
}

enum GeoBehavior {
    Fix(Coordinate),
    Fail(GeolocationError),
    Hang,
}

pub struct StubGeolocation(GeoBehavior);

impl StubGeolocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self(GeoBehavior::Fix(Coordinate::new(latitude, longitude)))
    }

    pub fn denied() -> Self {
        Self::failing(GeolocationError::PermissionDenied)
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self(GeoBehavior::Fail(error))
    }

    /// Never answers
    pub fn hanging() -> Self {
        Self(GeoBehavior::Hang)
    }
}

#[async_trait]
impl Geolocation for StubGeolocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        match &self.0 {
            GeoBehavior::Fix(coordinate) => Ok(*coordinate),
            GeoBehavior::Fail(error) => Err(error.clone()),
            GeoBehavior::Hang => std::future::pending().await,
        }
    }
}

pub struct StubTimezoneLookup {
    answer: Option<String>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StubTimezoneLookup {
    pub fn answering(zone: &str) -> Self {
        Self {
            answer: Some(zone.to_string()),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl TimezoneLookup for StubTimezoneLookup {
    async fn time_zone_for(&self, _at: Coordinate, _language: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.clone().ok_or_else(|| Error::Invalid {
            message: "lookup unavailable".to_string(),
        })
    }
}

pub struct StubGeocoder {
    answer: Result<Option<String>, ()>,
    calls: Arc<AtomicUsize>,
}

impl StubGeocoder {
    pub fn named(name: &str) -> Self {
        Self::answering(Ok(Some(name.to_string())))
    }

    /// Answers without a usable name
    pub fn empty() -> Self {
        Self::answering(Ok(None))
    }

    pub fn failing() -> Self {
        Self::answering(Err(()))
    }

    fn answering(answer: Result<Option<String>, ()>) -> Self {
        Self {
            answer,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ReverseGeocoder for StubGeocoder {
    async fn place_name(&self, _at: Coordinate, _language: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(|()| Error::Invalid {
            message: "geocoder unavailable".to_string(),
        })
    }
}

/// Overcast today, rain, clear, then snow
pub fn sample_readings() -> Readings {
    Readings {
        temperature: 4.6,
        humidity: 81.0,
        wind_speed: 12.4,
        pressure: 1012.7,
        weather_code: 3,
        daily_codes: vec![3, 61, 0, 75],
        daily_max: vec![5.2, 6.5, 2.4, -1.5],
    }
}

pub struct StubForecast {
    readings: Readings,
    delay: Duration,
    /// Per-call (delay, temperature) overrides, consumed in call order
    script: Mutex<VecDeque<(Duration, f64)>>,
    fail: Arc<AtomicBool>,
    requested: Arc<Mutex<Vec<Coordinate>>>,
}

impl StubForecast {
    pub fn sample() -> Self {
        Self {
            readings: sample_readings(),
            delay: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            fail: Arc::new(AtomicBool::new(false)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Only `days` daily entries, today included
    pub fn with_days(days: usize) -> Self {
        let mut stub = Self::sample();
        stub.readings.daily_codes.truncate(days);
        stub.readings.daily_max.truncate(days);
        stub
    }

    /// Answer every request after `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The n-th request waits `steps[n].0` and reports temperature `steps[n].1`
    pub fn scripted(steps: Vec<(Duration, f64)>) -> Self {
        let stub = Self::sample();
        *stub.script.lock() = steps.into();
        stub
    }

    /// Set to make every following request fail
    pub fn fail_switch(&self) -> Arc<AtomicBool> {
        self.fail.clone()
    }

    /// Coordinates of all requests so far
    pub fn requested(&self) -> Arc<Mutex<Vec<Coordinate>>> {
        self.requested.clone()
    }
}

#[async_trait]
impl ForecastSource for StubForecast {
    async fn forecast(&self, at: Coordinate) -> Result<Readings> {
        self.requested.lock().push(at);
        let mut readings = self.readings.clone();
        let step = self.script.lock().pop_front();
        let delay = match step {
            Some((delay, temperature)) => {
                readings.temperature = temperature;
                delay
            }
            None => self.delay,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Status {
                status: 503,
                url: "https://forecast.invalid/v1/forecast".to_string(),
            });
        }
        Ok(readings)
    }
}
