//! Durable fallback store for last-known-good readings
//!
//! One interface over two backends: a relational SQLite store keeping full
//! reading history, and a flat JSON document keeping only the latest reading
//! per country. Country is the natural key in both.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::client::Reading;
use crate::config::{Config, StoreBackend};
use crate::error::{Result, StoreError};

pub mod json_file;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

/// Persisted projection of the latest reading for a country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub country: String,
    pub city: String,
    pub aqi: i64,
    pub lat: f64,
    pub lon: f64,
    /// Capture time of the observation, not the write time
    pub timestamp: DateTime<Utc>,
}

impl StoredReading {
    /// Build the persisted projection for a country from a fetched reading
    pub fn from_reading(country: &str, reading: &Reading) -> Self {
        Self {
            country: country.to_string(),
            city: reading.city.clone(),
            aqi: reading.aqi,
            lat: reading.lat,
            lon: reading.lon,
            timestamp: reading.timestamp,
        }
    }

    /// Age of the reading at `now`; zero for timestamps in the future
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Store statistics for the status command
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_readings: usize,
    pub countries: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub last_batch_date: Option<NaiveDate>,
}

/// Durable key-value record of last-known-good readings, keyed by country.
///
/// Contract shared by both backends:
/// - `upsert` is atomic per country and idempotent; under racing writers the
///   reading with the later `timestamp` wins, regardless of arrival order.
/// - A failed write leaves the prior record for that country intact.
/// - Reads never observe a partially written record.
/// - Records are never deleted by this subsystem.
pub trait FallbackStore: Send + Sync {
    /// Latest stored reading for a country, if any
    fn get(&self, country: &str) -> std::result::Result<Option<StoredReading>, StoreError>;

    /// Persist a reading for a country (last-write-wins by timestamp)
    fn upsert(&self, country: &str, reading: &Reading) -> std::result::Result<(), StoreError>;

    /// Latest reading per country, for bulk display callers
    fn latest_per_country(&self) -> std::result::Result<Vec<StoredReading>, StoreError>;

    /// Stored readings for a city since a cutoff, oldest first.
    ///
    /// Training data for the forecasting collaborator. The JSON backend keeps
    /// no history and returns at most the latest record.
    fn history(
        &self,
        city: &str,
        since: DateTime<Utc>,
    ) -> std::result::Result<Vec<StoredReading>, StoreError>;

    /// Date of the last completed full-batch pass, if recorded
    fn last_batch_date(&self) -> std::result::Result<Option<NaiveDate>, StoreError>;

    /// Record the date of a completed full-batch pass
    fn set_last_batch_date(&self, date: NaiveDate) -> std::result::Result<(), StoreError>;

    /// Store statistics
    fn stats(&self) -> std::result::Result<StoreStats, StoreError>;
}

/// Open the store configured in `config`
pub fn open(config: &Config) -> Result<Arc<dyn FallbackStore>> {
    let path = config.store_path()?;
    open_at(config.store.backend, &path)
}

/// Open a store of the given backend at a specific path
pub fn open_at(backend: StoreBackend, path: &Path) -> Result<Arc<dyn FallbackStore>> {
    Ok(match backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open_at(path)?),
        StoreBackend::Json => Arc::new(JsonFileStore::open_at(path)?),
    })
}
