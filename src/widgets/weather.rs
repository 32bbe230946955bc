//! Weather Widget
//!
//! Combines the data and status channels into one view. An error shown over
//! an earlier snapshot marks that snapshot as stale instead of hiding it.

use crate::domain::{WeatherSnapshot, WeatherStatus};
use crate::services::{EventBus, SubscriptionGuard, WeatherState, WeatherUpdate};
use parking_lot::Mutex;
use std::sync::Arc;

/// What the weather widget currently knows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherView {
    pub snapshot: Option<WeatherSnapshot>,
    pub status: WeatherStatus,
}

impl WeatherView {
    /// An error is shown over a previous snapshot
    pub fn is_stale(&self) -> bool {
        self.status.error.is_some() && self.snapshot.is_some()
    }

    pub fn lines(&self) -> Vec<String> {
        let Some(snapshot) = &self.snapshot else {
            return vec![match &self.status.error {
                Some(error) => format!("Weather unavailable: {error}"),
                None => "Loading weather...".to_string(),
            }];
        };

        let mut heading = format!(
            "{}: {}°C {}",
            snapshot.location, snapshot.temperature, snapshot.condition
        );
        if self.status.loading {
            heading.push_str(" (updating)");
        } else if let Some(error) = &self.status.error {
            heading.push_str(&format!(" (stale: {error})"));
        }

        let details = format!(
            "Humidity {}%  Wind {} km/h  Visibility {} km  Pressure {} hPa",
            snapshot.humidity, snapshot.wind_speed, snapshot.visibility, snapshot.pressure
        );
        let forecast = snapshot
            .forecast
            .iter()
            .map(|day| format!("{} {}°C {}", day.day, day.temp, day.condition))
            .collect::<Vec<_>>()
            .join("  |  ");

        vec![heading, details, forecast]
    }
}

type OnChange = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Shows the latest weather and request status
pub struct WeatherWidget {
    view: Arc<Mutex<WeatherView>>,
    subscriptions: Vec<SubscriptionGuard>,
}

impl WeatherWidget {
    /// Subscribe to weather data and status; `on_change` receives the rendered lines
    pub fn mount(bus: &EventBus, on_change: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        let view = Arc::new(Mutex::new(WeatherView::default()));
        let on_change: OnChange = Arc::new(on_change);
        let mut subscriptions = Vec::new();

        let (state, notify) = (view.clone(), on_change.clone());
        subscriptions.push(bus.subscribe_scoped::<WeatherState>(move |status| {
            let lines = {
                let mut view = state.lock();
                view.status = status.clone();
                view.lines()
            };
            notify(&lines);
        }));

        let (state, notify) = (view.clone(), on_change);
        subscriptions.push(bus.subscribe_scoped::<WeatherUpdate>(move |snapshot| {
            let lines = {
                let mut view = state.lock();
                view.snapshot = Some(snapshot.clone());
                view.lines()
            };
            notify(&lines);
        }));

        Self {
            view,
            subscriptions,
        }
    }

    pub fn view(&self) -> WeatherView {
        self.view.lock().clone()
    }

    pub fn render(&self) -> Vec<String> {
        self.view.lock().lines()
    }

    pub fn is_stale(&self) -> bool {
        self.view.lock().is_stale()
    }

    pub fn is_mounted(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    pub fn unmount(&mut self) {
        self.subscriptions.clear();
    }
}

impl std::fmt::Debug for WeatherWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherWidget")
            .field("mounted", &self.is_mounted())
            .field("view", &*self.view.lock())
            .finish()
    }
}
