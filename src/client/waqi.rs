//! WAQI feed client implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;

use super::{AqiApi, Reading};
use crate::error::UpstreamError;

/// WAQI API base URL
const API_BASE_URL: &str = "https://api.waqi.info";

/// Bounded wait for one feed request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Requests per second against the WAQI API. The free tier is shared across
/// every caller of this process, so stay conservative.
const RATE_LIMIT_PER_SECOND: u32 = 2;

/// WAQI city feed client
pub struct WaqiClient {
    http: HttpClient,
    base_url: String,
    token: String,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

/// Feed endpoint response envelope
#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// The `data` object of an "ok" response
#[derive(Debug, Deserialize)]
struct FeedData {
    aqi: serde_json::Value,
    city: Option<FeedCity>,
}

#[derive(Debug, Deserialize)]
struct FeedCity {
    #[serde(default)]
    geo: Vec<f64>,
}

impl WaqiClient {
    /// Create a new WAQI client with the production base URL
    pub fn new(token: impl Into<String>) -> Result<Self, UpstreamError> {
        Self::with_base_url(token, API_BASE_URL)
    }

    /// Create a client against a specific base URL (for testing)
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, UpstreamError> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        let quota = Quota::per_second(std::num::NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
            rate_limiter,
        })
    }

    /// Parse the `data` object of an "ok" response into a Reading
    fn parse_data(city: &str, data: serde_json::Value) -> Result<Reading, UpstreamError> {
        let data: FeedData = serde_json::from_value(data)
            .map_err(|e| UpstreamError::InvalidPayload(format!("malformed feed data: {}", e)))?;

        // The provider reports "-" for stations with no current index
        let aqi = data
            .aqi
            .as_i64()
            .or_else(|| data.aqi.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| {
                UpstreamError::InvalidPayload(format!("non-numeric aqi value: {}", data.aqi))
            })?;

        let geo = data
            .city
            .map(|c| c.geo)
            .filter(|geo| geo.len() >= 2)
            .ok_or_else(|| {
                UpstreamError::InvalidPayload("missing geo coordinate pair".to_string())
            })?;

        Ok(Reading {
            city: city.to_string(),
            aqi,
            lat: geo[0],
            lon: geo[1],
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl AqiApi for WaqiClient {
    async fn fetch(&self, city: &str) -> Result<Reading, UpstreamError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/feed/{}/?token={}", self.base_url, city, self.token);
        log::debug!("Fetching AQI feed for {}", city);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Unavailable(format!(
                "feed request returned HTTP {}",
                status
            )));
        }

        let feed = response
            .json::<FeedResponse>()
            .await
            .map_err(|e| UpstreamError::InvalidPayload(format!("unparseable feed body: {}", e)))?;

        // Non-"ok" payload status carries the provider's error message in `data`
        if feed.status != "ok" {
            let detail = feed
                .data
                .as_ref()
                .and_then(|d| d.as_str())
                .unwrap_or(&feed.status)
                .to_string();
            return Err(UpstreamError::Unavailable(format!(
                "provider status {:?}: {}",
                feed.status, detail
            )));
        }

        let data = feed
            .data
            .ok_or_else(|| UpstreamError::InvalidPayload("ok response without data".to_string()))?;

        Self::parse_data(city, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(server: &mockito::ServerGuard) -> WaqiClient {
        WaqiClient::with_base_url("test-token", server.url()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed/Berlin/")
            .match_query(mockito::Matcher::UrlEncoded(
                "token".into(),
                "test-token".into(),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "status": "ok",
                    "data": { "aqi": 42, "city": { "geo": [52.5, 13.4], "name": "Berlin" } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let reading = client(&server).fetch("Berlin").await.unwrap();
        mock.assert_async().await;

        assert_eq!(reading.city, "Berlin");
        assert_eq!(reading.aqi, 42);
        assert_eq!(reading.lat, 52.5);
        assert_eq!(reading.lon, 13.4);
    }

    #[tokio::test]
    async fn test_fetch_error_status_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex("/feed/Nowhere/.*".into()))
            .with_status(200)
            .with_body(json!({"status": "error", "data": "Unknown station"}).to_string())
            .create_async()
            .await;

        let err = client(&server).fetch("Nowhere").await.unwrap_err();
        match err {
            UpstreamError::Unavailable(msg) => assert!(msg.contains("Unknown station")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex("/feed/Berlin/.*".into()))
            .with_status(503)
            .create_async()
            .await;

        let err = client(&server).fetch("Berlin").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_non_numeric_aqi() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex("/feed/Berlin/.*".into()))
            .with_status(200)
            .with_body(
                json!({
                    "status": "ok",
                    "data": { "aqi": "-", "city": { "geo": [52.5, 13.4] } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server).fetch("Berlin").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_fetch_missing_geo() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex("/feed/Berlin/.*".into()))
            .with_status(200)
            .with_body(json!({"status": "ok", "data": { "aqi": 42 }}).to_string())
            .create_async()
            .await;

        let err = client(&server).fetch("Berlin").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_fetch_garbage_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex("/feed/Berlin/.*".into()))
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let err = client(&server).fetch("Berlin").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidPayload(_)));
    }

    #[test]
    fn test_parse_data_rounds_float_aqi() {
        let data = json!({ "aqi": 41.6, "city": { "geo": [1.0, 2.0] } });
        let reading = WaqiClient::parse_data("Berlin", data).unwrap();
        assert_eq!(reading.aqi, 42);
    }
}
