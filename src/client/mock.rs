//! Mock AQI client for testing
//!
//! Scripted readings and failures per city, with call counting so tests can
//! assert that the upstream was (or was not) contacted.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AqiApi, Reading};
use crate::error::UpstreamError;

/// What the mock should do when a given city is fetched
#[derive(Debug, Clone)]
enum Scripted {
    Reading(Reading),
    Unavailable,
    InvalidPayload,
}

/// Mock upstream client.
///
/// Configure per-city responses via builder methods, then use in tests:
///
/// ```ignore
/// let mock = MockAqiClient::new().with_reading("Berlin", reading);
/// let got = mock.fetch("Berlin").await?;
/// assert_eq!(mock.fetch_count("Berlin"), 1);
/// ```
#[derive(Default)]
pub struct MockAqiClient {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MockAqiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful reading for a city
    pub fn with_reading(self, city: &str, reading: Reading) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(city.to_string(), Scripted::Reading(reading));
        self
    }

    /// Script an upstream failure for a city
    pub fn with_failure(self, city: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(city.to_string(), Scripted::Unavailable);
        self
    }

    /// Script a malformed payload for a city
    pub fn with_invalid_payload(self, city: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(city.to_string(), Scripted::InvalidPayload);
        self
    }

    /// Number of fetch calls made for a city
    pub fn fetch_count(&self, city: &str) -> usize {
        self.calls.lock().unwrap().get(city).copied().unwrap_or(0)
    }

    /// Total fetch calls across all cities
    pub fn total_fetches(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl AqiApi for MockAqiClient {
    async fn fetch(&self, city: &str) -> Result<Reading, UpstreamError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(city.to_string())
            .or_insert(0) += 1;

        match self.responses.lock().unwrap().get(city) {
            Some(Scripted::Reading(reading)) => Ok(reading.clone()),
            Some(Scripted::Unavailable) | None => Err(UpstreamError::Unavailable(format!(
                "mock upstream failure for {}",
                city
            ))),
            Some(Scripted::InvalidPayload) => Err(UpstreamError::InvalidPayload(format!(
                "mock invalid payload for {}",
                city
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(city: &str, aqi: i64) -> Reading {
        Reading {
            city: city.to_string(),
            aqi,
            lat: 52.5,
            lon: 13.4,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_scripted_reading() {
        let mock = MockAqiClient::new().with_reading("Berlin", reading("Berlin", 42));

        let got = mock.fetch("Berlin").await.unwrap();
        assert_eq!(got.aqi, 42);
        assert_eq!(mock.fetch_count("Berlin"), 1);
    }

    #[tokio::test]
    async fn test_unscripted_city_fails() {
        let mock = MockAqiClient::new();
        let err = mock.fetch("Paris").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_scripted_invalid_payload() {
        let mock = MockAqiClient::new().with_invalid_payload("Berlin");
        let err = mock.fetch("Berlin").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_call_counting() {
        let mock = MockAqiClient::new().with_reading("Berlin", reading("Berlin", 42));

        mock.fetch("Berlin").await.unwrap();
        mock.fetch("Berlin").await.unwrap();
        let _ = mock.fetch("Paris").await;

        assert_eq!(mock.fetch_count("Berlin"), 2);
        assert_eq!(mock.fetch_count("Paris"), 1);
        assert_eq!(mock.total_fetches(), 3);
    }
}
