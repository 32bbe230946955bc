//! Open-Meteo
//!
//! Current conditions and daily forecast (no API key).

use super::{ApiClient, ForecastSource};
use crate::domain::Readings;
use crate::error::Result;
use crate::services::Coordinate;
use async_trait::async_trait;
use serde::Deserialize;

const FORECAST_PATH: &str = "/v1/forecast";
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,wind_speed_10m,surface_pressure,weather_code";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max";

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub current: CurrentConditions,
    pub daily: DailyForecast,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    pub temperature_2m: f64,
    pub relative_humidity_2m: f64,
    pub wind_speed_10m: f64,
    pub surface_pressure: f64,
    pub weather_code: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyForecast {
    pub weather_code: Vec<u16>,
    pub temperature_2m_max: Vec<f64>,
}

impl From<ForecastResponse> for Readings {
    fn from(response: ForecastResponse) -> Self {
        let ForecastResponse { current, daily } = response;
        Readings {
            temperature: current.temperature_2m,
            humidity: current.relative_humidity_2m,
            wind_speed: current.wind_speed_10m,
            pressure: current.surface_pressure,
            weather_code: current.weather_code,
            daily_codes: daily.weather_code,
            daily_max: daily.temperature_2m_max,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OpenMeteo {
    client: ApiClient,
    base_url: String,
}

impl OpenMeteo {
    pub fn new(client: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ForecastSource for OpenMeteo {
    async fn forecast(&self, at: Coordinate) -> Result<Readings> {
        let query = [
            ("latitude", at.latitude.to_string()),
            ("longitude", at.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
        ];
        let response: ForecastResponse = self
            .client
            .get_json("getWeatherForecast", &self.base_url, FORECAST_PATH, &query)
            .await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "latitude": 52.52,
        "longitude": 13.419998,
        "timezone": "Europe/Berlin",
        "current": {
            "time": "2024-01-15T13:00",
            "temperature_2m": 4.6,
            "relative_humidity_2m": 81,
            "wind_speed_10m": 12.4,
            "surface_pressure": 1012.7,
            "weather_code": 3
        },
        "daily": {
            "time": ["2024-01-15", "2024-01-16", "2024-01-17", "2024-01-18"],
            "weather_code": [3, 61, 0, 75],
            "temperature_2m_max": [5.2, 6.5, 2.4, -1.5]
        }
    }"#;

    #[test]
    fn test_forecast_response_to_readings() {
        let response: ForecastResponse = serde_json::from_str(SAMPLE).expect("json");
        let readings = Readings::from(response);

        assert_eq!(readings.temperature, 4.6);
        assert_eq!(readings.humidity, 81.0);
        assert_eq!(readings.weather_code, 3);
        assert_eq!(readings.daily_codes, vec![3, 61, 0, 75]);
        assert_eq!(readings.daily_max, vec![5.2, 6.5, 2.4, -1.5]);
    }

    #[test]
    fn test_incomplete_response_is_rejected() {
        let result = serde_json::from_str::<ForecastResponse>(r#"{"current": {}, "daily": {}}"#);
        assert!(result.is_err());
    }
}
