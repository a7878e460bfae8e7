//! Error types for the BreatheSafe CLI

use thiserror::Error;

/// Result type alias for BreatheSafe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown city or country: {0}")]
    UnknownCity(String),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Upstream AQI provider errors.
///
/// Transport errors, timeouts, non-"ok" statuses and malformed payloads all
/// collapse into two variants so callers need a single failure branch.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Unavailable("Request timed out".to_string())
        } else if err.is_connect() {
            UpstreamError::Unavailable("Failed to connect to provider".to_string())
        } else if err.is_decode() {
            UpstreamError::InvalidPayload(err.to_string())
        } else {
            UpstreamError::Unavailable(err.to_string())
        }
    }
}

/// Fallback store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Corrupt store document: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `breathesafe init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("API token not configured. Run `breathesafe init` to set up your WAQI token.")]
    MissingApiToken,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Forecasting collaborator errors
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Not enough stored readings for {city}: have {have}, need {need}")]
    NotEnoughData { city: String, have: usize, need: usize },

    #[error("Prediction target is not after the trained data range")]
    TargetInTrainedRange,
}
