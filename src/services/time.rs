//! Time Service
//!
//! Emits a [`TimeSnapshot`] on [`TimeUpdate`] right away on start and then
//! once per tick. The time zone starts as the system zone and may be replaced
//! once by a geolocation-assisted lookup running in the background.
//!
//! ```text
//!            start()                    stop()
//! Stopped ──────────────▶ Running ──────────────▶ Stopped
//!                           │
//!                           ├─ tick ─▶ TimeSnapshot ─▶ bus
//!                           │
//!                           └─ (once) geolocation ─▶ timezone lookup
//! ```

use crate::api::TimezoneLookup;
use crate::constants::{
    FALLBACK_TIME_ZONE, LOCATION_MAX_AGE_SECS, LOOKUP_LANGUAGE, TIME_GEOLOCATION_TIMEOUT_MS,
    TIME_TICK_INTERVAL_MS,
};
use crate::domain::{DashboardConfig, TimeSnapshot};
use crate::error::{Error, Result};
use crate::services::{EventBus, Geolocation, PositionOptions, TimeUpdate, WallClock, locate};
use jiff::tz::TimeZone;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Time service configuration
#[derive(Clone, Debug, PartialEq)]
pub struct TimeConfig {
    /// Period between snapshots
    pub tick_interval: Duration,
    /// Zone used when the system zone cannot be determined
    pub fallback_time_zone: String,
    /// Options for the one-shot position request
    pub geolocation: PositionOptions,
    /// Language passed to the timezone lookup
    pub language: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(TIME_TICK_INTERVAL_MS),
            fallback_time_zone: FALLBACK_TIME_ZONE.to_string(),
            geolocation: PositionOptions::new(
                Duration::from_millis(TIME_GEOLOCATION_TIMEOUT_MS),
                Duration::from_secs(LOCATION_MAX_AGE_SECS),
            ),
            language: LOOKUP_LANGUAGE.to_string(),
        }
    }
}

impl From<&DashboardConfig> for TimeConfig {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.time.tick_interval_ms.max(1)),
            fallback_time_zone: config.time.fallback_time_zone.clone(),
            geolocation: PositionOptions::new(
                Duration::from_millis(config.time.geolocation_timeout_ms),
                config.location.max_age(),
            ),
            language: config.api.language.clone(),
        }
    }
}

/// Current zone and whether resolution has finished
struct ZoneState {
    name: String,
    zone: TimeZone,
    resolved: bool,
}

impl ZoneState {
    fn system(fallback: &str) -> Self {
        let (name, zone) = system_time_zone(fallback);
        Self {
            name,
            zone,
            resolved: false,
        }
    }
}

/// System zone, then `fallback`, then UTC
fn system_time_zone(fallback: &str) -> (String, TimeZone) {
    if let Ok(zone) = TimeZone::try_system() {
        if let Some(name) = zone.iana_name() {
            return (name.to_string(), zone.clone());
        }
    }

    match TimeZone::get(fallback) {
        Ok(zone) => (fallback.to_string(), zone),
        Err(err) => {
            tracing::warn!("Fallback time zone {fallback} unavailable: {err}");
            ("UTC".to_string(), TimeZone::UTC)
        }
    }
}

struct TimeInner {
    bus: EventBus,
    clock: Arc<dyn WallClock>,
    geolocation: Arc<dyn Geolocation>,
    lookup: Arc<dyn TimezoneLookup>,
    config: TimeConfig,
    zone: RwLock<ZoneState>,
    resolving: AtomicBool,
}

impl TimeInner {
    fn emit_time(&self) {
        let zone = self.zone.read().zone.clone();
        let snapshot = TimeSnapshot::at(self.clock.now(), &zone);
        tracing::trace!(time = %snapshot.clock_face(), "Time tick");
        self.bus.publish::<TimeUpdate>(snapshot);
    }

    async fn resolve_time_zone(&self) {
        let adopted = match self.lookup_time_zone().await {
            Ok(found) => Some(found),
            Err(err) => {
                tracing::info!("Using system time zone: {err}");
                None
            }
        };

        let mut state = self.zone.write();
        if let Some((name, zone)) = adopted {
            tracing::info!(zone = %name, "Time zone resolved from location");
            state.name = name;
            state.zone = zone;
        }
        state.resolved = true;
    }

    async fn lookup_time_zone(&self) -> Result<(String, TimeZone)> {
        let coordinate = locate(self.geolocation.as_ref(), self.config.geolocation).await?;
        let name = self
            .lookup
            .time_zone_for(coordinate, &self.config.language)
            .await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Invalid {
                message: "time zone lookup returned no identifier".to_string(),
            });
        }
        let zone = TimeZone::get(name)?;
        Ok((name.to_string(), zone))
    }
}

/// Periodic clock publisher
pub struct TimeService {
    inner: Arc<TimeInner>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl TimeService {
    pub fn new(
        bus: EventBus,
        clock: Arc<dyn WallClock>,
        geolocation: Arc<dyn Geolocation>,
        lookup: Arc<dyn TimezoneLookup>,
        config: TimeConfig,
    ) -> Self {
        let zone = RwLock::new(ZoneState::system(&config.fallback_time_zone));
        Self {
            inner: Arc::new(TimeInner {
                bus,
                clock,
                geolocation,
                lookup,
                config,
                zone,
                resolving: AtomicBool::new(false),
            }),
            ticker: Mutex::new(None),
        }
    }

    /// Start ticking. No-op when already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        {
            let mut ticker = self.ticker.lock();
            if ticker.is_some() {
                tracing::debug!("Time service already running");
                return;
            }

            let inner = self.inner.clone();
            let period = inner.config.tick_interval;
            *ticker = Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    interval.tick().await;
                    inner.emit_time();
                }
            }));
        }

        tracing::info!(zone = %self.time_zone(), "Starting time service");
        self.spawn_time_zone_resolution();

        // First tick of the interval is one period out
        self.inner.emit_time();
    }

    /// Stop ticking. No-op when stopped. An in-flight zone lookup keeps running.
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
            tracing::info!("Time service stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.lock().is_some()
    }

    /// IANA identifier of the zone used for the next tick
    pub fn time_zone(&self) -> String {
        self.inner.zone.read().name.clone()
    }

    /// Whether the one-shot zone resolution has finished (either way)
    pub fn is_time_zone_resolved(&self) -> bool {
        self.inner.zone.read().resolved
    }

    fn spawn_time_zone_resolution(&self) {
        if self.inner.zone.read().resolved || self.inner.resolving.swap(true, Ordering::SeqCst) {
            return;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.resolve_time_zone().await;
            inner.resolving.store(false, Ordering::SeqCst);
        });
    }
}

impl Drop for TimeService {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TimeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeService")
            .field("running", &self.is_running())
            .field("zone", &self.time_zone())
            .field("resolved", &self.is_time_zone_resolved())
            .finish()
    }
}
