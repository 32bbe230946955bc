//! Clock Widget

use crate::domain::TimeSnapshot;
use crate::services::{EventBus, SubscriptionGuard, TimeUpdate};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shows the latest [`TimeSnapshot`]
pub struct ClockWidget {
    latest: Arc<Mutex<TimeSnapshot>>,
    subscription: Option<SubscriptionGuard>,
}

impl ClockWidget {
    /// Subscribe to clock ticks; `on_change` receives the rendered line
    ///
    /// If the clock already ticked, `on_change` runs before this returns.
    pub fn mount(bus: &EventBus, on_change: impl Fn(&str) + Send + Sync + 'static) -> Self {
        let latest = Arc::new(Mutex::new(TimeSnapshot::placeholder()));

        let view = latest.clone();
        let subscription = bus.subscribe_scoped::<TimeUpdate>(move |snapshot| {
            *view.lock() = snapshot.clone();
            on_change(&render(snapshot));
        });

        Self {
            latest,
            subscription: Some(subscription),
        }
    }

    /// "HH:MM:SS  Mon Jan 15  CET"
    pub fn render(&self) -> String {
        render(&self.latest.lock())
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stop receiving ticks; the last value stays visible
    pub fn unmount(&mut self) {
        self.subscription.take();
    }
}

fn render(snapshot: &TimeSnapshot) -> String {
    format!(
        "{}  {}  {}",
        snapshot.clock_face(),
        snapshot.date_label,
        snapshot.tz_abbreviation
    )
}

impl std::fmt::Debug for ClockWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockWidget")
            .field("mounted", &self.is_mounted())
            .field("time", &self.render())
            .finish()
    }
}
