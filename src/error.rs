//! Error types for the dashboard
//!
//! Centralized error handling using snafu for ergonomic error definitions.

use crate::services::GeolocationError;
use snafu::Snafu;

/// Main error type for the application
#[derive(Debug, Snafu)]
pub enum Error {
    /// Invalid input or configuration
    #[snafu(display("Invalid: {message}"))]
    Invalid { message: String },

    /// IO error (config and log files)
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// TOML deserialization error
    #[snafu(display("TOML parse error: {source}"))]
    TomlDe { source: toml::de::Error },

    /// HTTP transport or body decoding error
    #[snafu(display("HTTP error: {source}"))]
    Http { source: reqwest::Error },

    /// Remote answered with a non-success status
    #[snafu(display("Request failed: {status} ({url})"))]
    Status { status: u16, url: String },

    /// Time zone or calendar arithmetic error
    #[snafu(display("Time error: {source}"))]
    Time { source: jiff::Error },

    /// No position could be obtained
    #[snafu(display("Geolocation error: {source}"))]
    Geolocation { source: GeolocationError },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Error::TomlDe { source }
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        Error::Http { source }
    }
}

impl From<jiff::Error> for Error {
    fn from(source: jiff::Error) -> Self {
        Error::Time { source }
    }
}

impl From<GeolocationError> for Error {
    fn from(source: GeolocationError) -> Self {
        Error::Geolocation { source }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
