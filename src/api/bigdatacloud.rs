//! BigDataCloud
//!
//! Timezone-by-location and reverse geocoding (free tier, no API key).

use super::{ApiClient, ReverseGeocoder, TimezoneLookup};
use crate::error::Result;
use crate::services::Coordinate;
use async_trait::async_trait;
use serde::Deserialize;

const TIMEZONE_PATH: &str = "/data/timezone-by-location";
const REVERSE_GEOCODE_PATH: &str = "/data/reverse-geocode-client";

/// Response of the timezone-by-location endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimezoneResponse {
    pub iana_time_id: String,
}

/// Response of the reverse geocode endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReverseGeocodeResponse {
    pub city: Option<String>,
    pub locality: Option<String>,
    pub principal_subdivision: Option<String>,
}

impl ReverseGeocodeResponse {
    /// Most specific non-empty name: city, then locality, then region
    pub fn place_name(self) -> Option<String> {
        [self.city, self.locality, self.principal_subdivision]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct BigDataCloud {
    client: ApiClient,
    base_url: String,
}

impl BigDataCloud {
    pub fn new(client: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn query(at: Coordinate, language: &str) -> [(&'static str, String); 3] {
        [
            ("latitude", at.latitude.to_string()),
            ("longitude", at.longitude.to_string()),
            ("localityLanguage", language.to_string()),
        ]
    }
}

#[async_trait]
impl TimezoneLookup for BigDataCloud {
    async fn time_zone_for(&self, at: Coordinate, language: &str) -> Result<String> {
        let response: TimezoneResponse = self
            .client
            .get_json(
                "getTimezoneByLocation",
                &self.base_url,
                TIMEZONE_PATH,
                &Self::query(at, language),
            )
            .await?;
        Ok(response.iana_time_id)
    }
}

#[async_trait]
impl ReverseGeocoder for BigDataCloud {
    async fn place_name(&self, at: Coordinate, language: &str) -> Result<Option<String>> {
        let response: ReverseGeocodeResponse = self
            .client
            .get_json(
                "getReverseGeocode",
                &self.base_url,
                REVERSE_GEOCODE_PATH,
                &Self::query(at, language),
            )
            .await?;
        Ok(response.place_name())
    }
}
