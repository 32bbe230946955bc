//! Weather Service
//!
//! Fetches current conditions and a three-day forecast on request and
//! publishes the request lifecycle on [`WeatherState`] and the result on
//! [`WeatherUpdate`].
//!
//! A failed fetch only publishes an error status; the previous snapshot stays
//! cached so consumers keep showing the last known weather.

use crate::api::{ForecastSource, ReverseGeocoder};
use crate::constants::{
    FALLBACK_LATITUDE, FALLBACK_LOCATION_NAME, FALLBACK_LONGITUDE, LOCATION_MAX_AGE_SECS,
    LOOKUP_LANGUAGE, UNKNOWN_LOCATION_LABEL, WEATHER_FETCH_ERROR, WEATHER_GEOLOCATION_TIMEOUT_MS,
};
use crate::domain::{DashboardConfig, WeatherSnapshot, WeatherStatus, local_date};
use crate::error::Result;
use crate::services::{
    Coordinate, EventBus, Geolocation, PositionOptions, WallClock, WeatherState, WeatherUpdate,
    locate,
};
use jiff::tz::TimeZone;
use std::sync::Arc;
use std::time::Duration;

/// Weather service configuration
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherConfig {
    /// Used when no position is available
    pub fallback: Coordinate,
    /// Label shown for the fallback position
    pub fallback_label: String,
    /// Options for the position request
    pub geolocation: PositionOptions,
    /// Language passed to the reverse geocoder
    pub language: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            fallback: Coordinate::new(FALLBACK_LATITUDE, FALLBACK_LONGITUDE),
            fallback_label: FALLBACK_LOCATION_NAME.to_string(),
            geolocation: PositionOptions::new(
                Duration::from_millis(WEATHER_GEOLOCATION_TIMEOUT_MS),
                Duration::from_secs(LOCATION_MAX_AGE_SECS),
            ),
            language: LOOKUP_LANGUAGE.to_string(),
        }
    }
}

impl From<&DashboardConfig> for WeatherConfig {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            fallback: config.weather.fallback(),
            fallback_label: config.weather.fallback_label.clone(),
            geolocation: PositionOptions::new(
                Duration::from_millis(config.weather.geolocation_timeout_ms),
                config.location.max_age(),
            ),
            language: config.api.language.clone(),
        }
    }
}

/// On-demand weather publisher
pub struct WeatherService {
    bus: EventBus,
    clock: Arc<dyn WallClock>,
    geolocation: Arc<dyn Geolocation>,
    forecast: Arc<dyn ForecastSource>,
    geocoder: Arc<dyn ReverseGeocoder>,
    config: WeatherConfig,
    /// Zone used to name the forecast days
    time_zone: TimeZone,
}

impl WeatherService {
    pub fn new(
        bus: EventBus,
        clock: Arc<dyn WallClock>,
        geolocation: Arc<dyn Geolocation>,
        forecast: Arc<dyn ForecastSource>,
        geocoder: Arc<dyn ReverseGeocoder>,
        config: WeatherConfig,
    ) -> Self {
        Self {
            bus,
            clock,
            geolocation,
            forecast,
            geocoder,
            config,
            time_zone: TimeZone::system(),
        }
    }

    /// Name forecast days in `zone` instead of the system zone
    pub fn with_time_zone(mut self, zone: TimeZone) -> Self {
        self.time_zone = zone;
        self
    }

    /// Fetch weather for the current position, or for the fallback location
    /// when no position is available
    ///
    /// Concurrent calls are not cancelled; the last one to finish wins.
    pub async fn fetch_weather(&self) {
        self.publish_status(WeatherStatus::loading());

        match locate(self.geolocation.as_ref(), self.config.geolocation).await {
            Ok(at) => {
                self.fetch_weather_for_location(at.latitude, at.longitude, None)
                    .await
            }
            Err(err) => {
                tracing::info!(
                    "Geolocation unavailable ({err}), using {}",
                    self.config.fallback_label
                );
                let fallback = self.config.fallback;
                self.fetch_weather_for_location(
                    fallback.latitude,
                    fallback.longitude,
                    Some(&self.config.fallback_label),
                )
                .await
            }
        }
    }

    /// Fetch weather at a coordinate
    ///
    /// Without a `label` the place name comes from reverse geocoding.
    pub async fn fetch_weather_for_location(
        &self,
        latitude: f64,
        longitude: f64,
        label: Option<&str>,
    ) {
        self.publish_status(WeatherStatus::loading());

        let at = Coordinate::new(latitude, longitude);
        match self.build_snapshot(at, label).await {
            Ok(snapshot) => {
                tracing::info!(
                    location = %snapshot.location,
                    temperature = snapshot.temperature,
                    condition = %snapshot.condition,
                    "Weather updated"
                );
                self.publish_status(WeatherStatus::ready());
                self.bus.publish::<WeatherUpdate>(snapshot);
            }
            Err(err) => {
                tracing::error!(%at, "Weather fetch error: {err}");
                self.publish_status(WeatherStatus::failed(WEATHER_FETCH_ERROR));
            }
        }
    }

    async fn build_snapshot(&self, at: Coordinate, label: Option<&str>) -> Result<WeatherSnapshot> {
        let readings = self.forecast.forecast(at).await?;

        let location = match label {
            Some(label) => label.into(),
            None => self.place_name(at).await,
        };

        let today = local_date(self.clock.now(), &self.time_zone);
        WeatherSnapshot::from_readings(&readings, location, today)
    }

    /// Never fails; falls back to a generic label
    async fn place_name(&self, at: Coordinate) -> Arc<str> {
        match self.geocoder.place_name(at, &self.config.language).await {
            Ok(Some(name)) => name.into(),
            Ok(None) => UNKNOWN_LOCATION_LABEL.into(),
            Err(err) => {
                tracing::warn!(%at, "Reverse geocoding failed: {err}");
                UNKNOWN_LOCATION_LABEL.into()
            }
        }
    }

    fn publish_status(&self, status: WeatherStatus) {
        self.bus.publish::<WeatherState>(status);
    }
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Condition;
    use crate::services::testing::{
        FixedClock, StubForecast, StubGeocoder, StubGeolocation, test_bus,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::Ordering;

    struct Harness {
        bus: EventBus,
        service: WeatherService,
        statuses: Arc<Mutex<Vec<WeatherStatus>>>,
        snapshots: Arc<Mutex<Vec<WeatherSnapshot>>>,
    }

    fn harness(geolocation: StubGeolocation, forecast: StubForecast, geocoder: StubGeocoder) -> Harness {
        let bus = test_bus();
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let snapshots = Arc::new(Mutex::new(Vec::new()));

        let sink = statuses.clone();
        bus.subscribe::<WeatherState>(move |status| sink.lock().push(status.clone()));
        let sink = snapshots.clone();
        bus.subscribe::<WeatherUpdate>(move |snapshot| sink.lock().push(snapshot.clone()));

        let service = WeatherService::new(
            bus.clone(),
            Arc::new(FixedClock::at("2024-01-15T12:00:00Z")),
            Arc::new(geolocation),
            Arc::new(forecast),
            Arc::new(geocoder),
            WeatherConfig::default(),
        )
        .with_time_zone(TimeZone::UTC);

        Harness {
            bus,
            service,
            statuses,
            snapshots,
        }
    }

    #[tokio::test]
    async fn test_denied_geolocation_falls_back_to_berlin() {
        let forecast = StubForecast::sample();
        let requested = forecast.requested();
        let h = harness(StubGeolocation::denied(), forecast, StubGeocoder::named("Nowhere"));

        h.service.fetch_weather().await;

        assert_eq!(*requested.lock(), vec![Coordinate::new(52.52, 13.41)]);
        assert_eq!(
            *h.statuses.lock(),
            vec![WeatherStatus::loading(), WeatherStatus::ready()]
        );
        let snapshots = h.snapshots.lock();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(&*snapshots[0].location, "Berlin");
    }

    #[tokio::test]
    async fn test_located_fetch_uses_reverse_geocoding() {
        let forecast = StubForecast::sample();
        let requested = forecast.requested();
        let h = harness(
            StubGeolocation::at(59.437, 24.7536),
            forecast,
            StubGeocoder::named("Tallinn"),
        );

        h.service.fetch_weather().await;

        assert_eq!(*requested.lock(), vec![Coordinate::new(59.437, 24.7536)]);
        let snapshot = h.bus.cached::<WeatherUpdate>().expect("snapshot");
        assert_eq!(&*snapshot.location, "Tallinn");
        assert_eq!(snapshot.condition, Condition::Cloudy);
        let days: Vec<_> = snapshot.forecast.iter().map(|d| d.day.to_string()).collect();
        assert_eq!(days, vec!["Tue", "Wed", "Thu"]);
    }

    #[tokio::test]
    async fn test_geocoding_failure_uses_generic_label() {
        for geocoder in [StubGeocoder::failing(), StubGeocoder::empty()] {
            let h = harness(StubGeolocation::at(1.0, 2.0), StubForecast::sample(), geocoder);

            h.service.fetch_weather().await;

            let snapshot = h.bus.cached::<WeatherUpdate>().expect("snapshot");
            assert_eq!(&*snapshot.location, "Your Location");
            assert_eq!(h.bus.cached::<WeatherState>(), Some(WeatherStatus::ready()));
        }
    }

    #[tokio::test]
    async fn test_forecast_failure_keeps_last_snapshot() {
        let forecast = StubForecast::sample();
        let fail = forecast.fail_switch();
        let h = harness(StubGeolocation::denied(), forecast, StubGeocoder::failing());

        h.service.fetch_weather().await;
        let before = h.bus.cached::<WeatherUpdate>().expect("snapshot");

        fail.store(true, Ordering::SeqCst);
        h.service.fetch_weather().await;

        assert_eq!(
            *h.statuses.lock(),
            vec![
                WeatherStatus::loading(),
                WeatherStatus::ready(),
                WeatherStatus::loading(),
                WeatherStatus::failed("Failed to fetch weather data"),
            ]
        );
        assert_eq!(h.snapshots.lock().len(), 1);
        assert_eq!(h.bus.cached::<WeatherUpdate>(), Some(before));
    }

    #[tokio::test]
    async fn test_short_forecast_is_a_fetch_failure() {
        let h = harness(
            StubGeolocation::denied(),
            StubForecast::with_days(2),
            StubGeocoder::failing(),
        );

        h.service.fetch_weather().await;

        assert!(h.snapshots.lock().is_empty());
        assert_eq!(
            h.bus.cached::<WeatherState>(),
            Some(WeatherStatus::failed(WEATHER_FETCH_ERROR))
        );
    }

    #[tokio::test]
    async fn test_identical_weather_delivered_once() {
        let h = harness(StubGeolocation::denied(), StubForecast::sample(), StubGeocoder::failing());

        h.service.fetch_weather().await;
        h.service.fetch_weather().await;

        assert_eq!(h.snapshots.lock().len(), 1);
        assert_eq!(h.statuses.lock().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_geolocation_timeout_falls_back_to_berlin() {
        let forecast = StubForecast::sample();
        let requested = forecast.requested();
        let h = harness(StubGeolocation::hanging(), forecast, StubGeocoder::named("Nowhere"));

        let started = tokio::time::Instant::now();
        h.service.fetch_weather().await;

        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(*requested.lock(), vec![Coordinate::new(52.52, 13.41)]);
        assert_eq!(
            *h.statuses.lock(),
            vec![WeatherStatus::loading(), WeatherStatus::ready()]
        );
        let snapshot = h.bus.cached::<WeatherUpdate>().expect("snapshot");
        assert_eq!(&*snapshot.location, "Berlin");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_last_publish_wins() {
        let forecast = StubForecast::scripted(vec![
            (Duration::from_secs(2), 1.0),
            (Duration::from_millis(500), 2.0),
        ]);
        let requested = forecast.requested();
        let h = harness(StubGeolocation::denied(), forecast, StubGeocoder::failing());

        tokio::join!(h.service.fetch_weather(), h.service.fetch_weather());

        assert_eq!(requested.lock().len(), 2);
        let temperatures: Vec<_> = h.snapshots.lock().iter().map(|s| s.temperature).collect();
        assert_eq!(temperatures, vec![2, 1]);
        assert_eq!(h.bus.cached::<WeatherUpdate>().map(|s| s.temperature), Some(1));
        assert_eq!(h.bus.cached::<WeatherState>(), Some(WeatherStatus::ready()));
    }

    #[tokio::test]
    async fn test_explicit_label_skips_geocoding() {
        let geocoder = StubGeocoder::named("Elsewhere");
        let calls = geocoder.calls();
        let h = harness(StubGeolocation::denied(), StubForecast::sample(), geocoder);

        h.service
            .fetch_weather_for_location(48.85, 2.35, Some("Paris"))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let snapshot = h.bus.cached::<WeatherUpdate>().expect("snapshot");
        assert_eq!(&*snapshot.location, "Paris");
    }
}
