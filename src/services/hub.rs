//! Service Hub
//!
//! Owns the event bus and both services, and drives their lifecycle for the
//! dashboard.

use crate::api::{
    ApiClient, BigDataCloud, ForecastSource, OpenMeteo, ReverseGeocoder, TimezoneLookup,
};
use crate::domain::DashboardConfig;
use crate::error::Result;
use crate::services::{
    ConfiguredGeolocation, EventBus, FixCache, Geolocation, SystemClock, TimeConfig, TimeService,
    WallClock, WeatherConfig, WeatherService, dashboard_bus,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// External dependencies of the services
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn WallClock>,
    pub geolocation: Arc<dyn Geolocation>,
    pub time_zones: Arc<dyn TimezoneLookup>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub forecast: Arc<dyn ForecastSource>,
}

impl Collaborators {
    /// HTTP adapters, the system clock and the configured position
    pub fn production(config: &DashboardConfig) -> Result<Self> {
        let client = ApiClient::new(config.api.request_timeout())?;
        let bigdatacloud = Arc::new(BigDataCloud::new(
            client.clone(),
            config.api.bigdatacloud_url.clone(),
        ));
        let open_meteo = Arc::new(OpenMeteo::new(client, config.api.open_meteo_url.clone()));
        let geolocation = FixCache::new(ConfiguredGeolocation::new(config.location.coordinate()));

        Ok(Self {
            clock: Arc::new(SystemClock),
            geolocation: Arc::new(geolocation),
            time_zones: bigdatacloud.clone(),
            geocoder: bigdatacloud,
            forecast: open_meteo,
        })
    }
}

/// Central hub for the dashboard services
pub struct ServiceHub {
    bus: EventBus,
    time: TimeService,
    weather: Arc<WeatherService>,
    /// Periodic weather refresh; `None` fetches once per start
    refresh_interval: Option<Duration>,
    /// Stops the refresh schedule of the running weather task
    weather_stop: Mutex<Option<watch::Sender<bool>>>,
}

impl ServiceHub {
    /// Create a hub talking to the real APIs
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::with_collaborators(
            config,
            Collaborators::production(config)?,
        ))
    }

    pub fn with_collaborators(config: &DashboardConfig, collaborators: Collaborators) -> Self {
        let bus = dashboard_bus();

        let time = TimeService::new(
            bus.clone(),
            collaborators.clock.clone(),
            collaborators.geolocation.clone(),
            collaborators.time_zones,
            TimeConfig::from(config),
        );
        let weather = WeatherService::new(
            bus.clone(),
            collaborators.clock,
            collaborators.geolocation,
            collaborators.forecast,
            collaborators.geocoder,
            WeatherConfig::from(config),
        );

        Self {
            bus,
            time,
            weather: Arc::new(weather),
            refresh_interval: config.weather.refresh_interval(),
            weather_stop: Mutex::new(None),
        }
    }

    /// Bus the widgets subscribe to
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn time(&self) -> &TimeService {
        &self.time
    }

    pub fn weather(&self) -> &Arc<WeatherService> {
        &self.weather
    }

    /// Start the clock and the initial weather fetch
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        tracing::info!(refresh = ?self.refresh_interval, "Starting all services");
        self.time.start();

        let mut weather_stop = self.weather_stop.lock();
        if weather_stop.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        *weather_stop = Some(stop_tx);

        let weather = self.weather.clone();
        let refresh_interval = self.refresh_interval;
        tokio::spawn(async move {
            let Some(period) = refresh_interval else {
                weather.fetch_weather().await;
                return;
            };

            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                // A fetch in flight always runs to completion
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => weather.fetch_weather().await,
                }
            }
            tracing::debug!("Weather refresh stopped");
        });
    }

    /// Stop the clock and the weather refresh schedule
    ///
    /// A weather fetch already in flight still completes and publishes its
    /// final status.
    pub fn stop(&self) {
        tracing::info!("Stopping all services");
        self.time.stop();
        if let Some(stop) = self.weather_stop.lock().take() {
            let _ = stop.send(true);
        }
    }
}

impl Drop for ServiceHub {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ServiceHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHub")
            .field("time", &self.time)
            .field("weather", &self.weather)
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherStatus;
    use crate::services::testing::{
        StubForecast, StubGeocoder, StubGeolocation, StubTimezoneLookup, TickingClock,
    };
    use crate::services::{TimeUpdate, WeatherState, WeatherUpdate};

    fn hub(config: &DashboardConfig, forecast: StubForecast) -> ServiceHub {
        ServiceHub::with_collaborators(
            config,
            Collaborators {
                clock: Arc::new(TickingClock::starting_at("2024-01-15T12:00:00Z")),
                geolocation: Arc::new(StubGeolocation::denied()),
                time_zones: Arc::new(StubTimezoneLookup::failing()),
                geocoder: Arc::new(StubGeocoder::failing()),
                forecast: Arc::new(forecast),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_publishes_time_and_weather() {
        let hub = hub(&DashboardConfig::default(), StubForecast::sample());

        hub.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(hub.bus().cached::<TimeUpdate>().is_some());
        assert_eq!(hub.bus().cached::<WeatherState>(), Some(WeatherStatus::ready()));
        let snapshot = hub.bus().cached::<WeatherUpdate>().expect("weather");
        assert_eq!(&*snapshot.location, "Berlin");

        hub.stop();
        assert!(!hub.time().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_refresh() {
        let config = DashboardConfig::parse("[weather]\nrefresh_interval_secs = 60\n")
            .expect("config");
        let forecast = StubForecast::sample();
        let requested = forecast.requested();
        let hub = hub(&config, forecast);

        hub.start();
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(requested.lock().len(), 3);

        hub.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(requested.lock().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_running_fetch_finish() {
        let hub = hub(
            &DashboardConfig::default(),
            StubForecast::sample().with_delay(Duration::from_secs(2)),
        );

        hub.start();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(hub.bus().cached::<WeatherState>(), Some(WeatherStatus::loading()));

        hub.stop();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(hub.bus().cached::<WeatherState>(), Some(WeatherStatus::ready()));
        assert!(hub.bus().cached::<WeatherUpdate>().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_periodic_fetch() {
        let config = DashboardConfig::parse("[weather]\nrefresh_interval_secs = 60\n")
            .expect("config");
        let forecast = StubForecast::sample().with_delay(Duration::from_secs(2));
        let requested = forecast.requested();
        let hub = hub(&config, forecast);

        hub.start();
        tokio::time::sleep(Duration::from_millis(500)).await;
        hub.stop();
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert_eq!(requested.lock().len(), 1);
        assert_eq!(hub.bus().cached::<WeatherState>(), Some(WeatherStatus::ready()));

        hub.start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(requested.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_fetch_without_refresh() {
        let forecast = StubForecast::sample();
        let requested = forecast.requested();
        let hub = hub(&DashboardConfig::default(), forecast);

        hub.start();
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(requested.lock().len(), 1);
    }
}
