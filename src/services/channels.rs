//! Dashboard Channels
//!
//! | Channel          | Payload           | Policy                 |
//! |------------------|-------------------|------------------------|
//! | `time.update`    | [`TimeSnapshot`]  | cached                 |
//! | `weather.update` | [`WeatherSnapshot`] | cached, deep dedup   |
//! | `weather.state`  | [`WeatherStatus`] | cached, shallow dedup  |

use crate::domain::{TimeSnapshot, WeatherSnapshot, WeatherStatus};
use crate::services::{Channel, ChannelConfig, EventBus};

/// Clock ticks
pub struct TimeUpdate;

impl Channel for TimeUpdate {
    type Payload = TimeSnapshot;
    const NAME: &'static str = "time.update";
}

/// Fresh weather data
pub struct WeatherUpdate;

impl Channel for WeatherUpdate {
    type Payload = WeatherSnapshot;
    const NAME: &'static str = "weather.update";
}

/// Weather request lifecycle
pub struct WeatherState;

impl Channel for WeatherState {
    type Payload = WeatherStatus;
    const NAME: &'static str = "weather.state";
}

/// Bus with every dashboard channel declared
pub fn dashboard_bus() -> EventBus {
    EventBus::builder()
        .channel(ChannelConfig::<TimeUpdate>::new().cached())
        .channel(ChannelConfig::<WeatherUpdate>::new().cached().dedup_deep())
        .channel(ChannelConfig::<WeatherState>::new().cached().dedup_shallow())
        .build()
}
