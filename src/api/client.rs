//! API Client
//!
//! Thin JSON-over-HTTP wrapper shared by the lookup adapters. Every request
//! is logged at start, success and failure.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// GET `base_url` + `path` with `query` and decode the JSON body
    ///
    /// Non-success statuses are errors.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        request_name: &'static str,
        base_url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = join_url(base_url, path);
        tracing::debug!(request = request_name, %url, ?query, "Request started");

        let result = self.send(&url, query).await;
        match &result {
            Ok(_) => tracing::debug!(request = request_name, "Request succeeded"),
            Err(err) => tracing::warn!(request = request_name, "Request failed: {err}"),
        }
        result
    }

    async fn send<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Join a base URL and an endpoint path with exactly one slash
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
