//! Upstream AQI provider client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

#[cfg(test)]
pub mod mock;
pub mod waqi;

#[cfg(test)]
pub use mock::MockAqiClient;
pub use waqi::WaqiClient;

/// Upstream AQI provider trait.
///
/// A single operation: fetch the current reading for one city or fail. All
/// transport, timeout, status and payload problems collapse into
/// `UpstreamError`, so callers need one failure branch rather than an
/// exception taxonomy. No retries at this layer; retry-or-fallback policy
/// belongs to the refresh orchestrator.
#[async_trait]
pub trait AqiApi: Send + Sync {
    /// Fetch the current reading for a city
    async fn fetch(&self, city: &str) -> Result<Reading, UpstreamError>;
}

/// One AQI observation for a city at an instant.
///
/// `timestamp` is the moment the value was obtained from the provider, never
/// a later write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// City the observation is for
    pub city: String,

    /// Air Quality Index value
    pub aqi: i64,

    /// Station latitude
    pub lat: f64,

    /// Station longitude
    pub lon: f64,

    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Whether the reading is safe to persist: coordinates are finite and
    /// the AQI is non-negative. Partial or garbage payloads never reach the
    /// fallback store.
    pub fn is_storable(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.aqi >= 0
    }
}
