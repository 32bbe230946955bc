//! Weather - Conditions, Forecast and Request Status

use crate::constants::{DEFAULT_VISIBILITY_KM, FORECAST_DAYS};
use crate::error::{Error, Result};
use crate::services::ShallowEq;
use jiff::civil::Date;
use jiff::{Span, Timestamp};
use std::sync::Arc;

/// Coarse weather condition derived from a WMO weather code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Clear,
    Cloudy,
    Rainy,
    Snowy,
    Stormy,
}

impl Condition {
    /// Map a weather code; thresholds are inclusive upper bounds, first match wins
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Condition::Clear,
            1..=3 => Condition::Cloudy,
            4..=67 => Condition::Rainy,
            68..=77 => Condition::Snowy,
            _ => Condition::Stormy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Condition::Clear => "Clear",
            Condition::Cloudy => "Cloudy",
            Condition::Rainy => "Rainy",
            Condition::Snowy => "Snowy",
            Condition::Stormy => "Stormy",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One day of the short forecast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastDay {
    /// Short weekday (e.g., "Tue")
    pub day: Arc<str>,
    /// Maximum temperature (°C)
    pub temp: i32,
    pub condition: Condition,
}

/// Current conditions plus the next three days
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherSnapshot {
    /// Temperature (°C)
    pub temperature: i32,
    pub condition: Condition,
    /// Relative humidity (%)
    pub humidity: i32,
    /// Wind speed (km/h)
    pub wind_speed: i32,
    /// Visibility (km)
    pub visibility: u32,
    /// Surface pressure (hPa)
    pub pressure: i32,
    /// Human-readable place name
    pub location: Arc<str>,
    pub forecast: Vec<ForecastDay>,
}

/// Raw readings needed to build a [`WeatherSnapshot`]
#[derive(Debug, Clone, PartialEq)]
pub struct Readings {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub pressure: f64,
    pub weather_code: u16,
    /// Daily weather codes, index 0 is today
    pub daily_codes: Vec<u16>,
    /// Daily maximum temperatures, index 0 is today
    pub daily_max: Vec<f64>,
}

impl WeatherSnapshot {
    /// Build a snapshot from raw readings
    ///
    /// The forecast covers the [`FORECAST_DAYS`] days after `today`; readings
    /// missing any of them are rejected.
    pub fn from_readings(readings: &Readings, location: Arc<str>, today: Date) -> Result<Self> {
        let forecast = (1..=FORECAST_DAYS)
            .map(|offset| {
                let (Some(&code), Some(&max)) = (
                    readings.daily_codes.get(offset),
                    readings.daily_max.get(offset),
                ) else {
                    return Err(Error::Invalid {
                        message: format!("forecast is missing day {offset}"),
                    });
                };
                let date = today.checked_add(Span::new().days(offset as i64))?;

                Ok(ForecastDay {
                    day: date.strftime("%a").to_string().into(),
                    temp: round(max),
                    condition: Condition::from_code(code),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            temperature: round(readings.temperature),
            condition: Condition::from_code(readings.weather_code),
            humidity: round(readings.humidity),
            wind_speed: round(readings.wind_speed),
            visibility: DEFAULT_VISIBILITY_KM,
            pressure: round(readings.pressure),
            location,
            forecast,
        })
    }
}

fn round(value: f64) -> i32 {
    value.round() as i32
}

/// Loading/error state of the weather request lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherStatus {
    pub loading: bool,
    pub error: Option<Arc<str>>,
}

impl WeatherStatus {
    /// A request is in flight
    pub fn loading() -> Self {
        Self {
            loading: true,
            error: None,
        }
    }

    /// The last request succeeded
    pub fn ready() -> Self {
        Self {
            loading: false,
            error: None,
        }
    }

    /// The last request failed
    pub fn failed(message: impl Into<Arc<str>>) -> Self {
        Self {
            loading: false,
            error: Some(message.into()),
        }
    }
}

impl Default for WeatherStatus {
    fn default() -> Self {
        Self::loading()
    }
}

impl ShallowEq for WeatherStatus {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.loading == other.loading && self.error == other.error
    }
}

/// Calendar date of `now` in `zone`
pub fn local_date(now: Timestamp, zone: &jiff::tz::TimeZone) -> Date {
    now.to_zoned(zone.clone()).date()
}
