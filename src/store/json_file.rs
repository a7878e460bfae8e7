//! Flat-file fallback store: one JSON document keyed by country
//!
//! The whole document is rewritten atomically (temp file + rename) on every
//! upsert, so a crashed or failed write never leaves a half-written store
//! behind. Only the latest reading per country is kept; there is no history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{FallbackStore, StoreStats, StoredReading};
use crate::client::Reading;
use crate::error::StoreError;

type Result<T> = std::result::Result<T, StoreError>;

/// On-disk document shape
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    countries: BTreeMap<String, StoredReading>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_batch_date: Option<NaiveDate>,
}

/// JSON-document fallback store
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonFileStore {
    /// Open or create the store at a specific file path
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create store dir: {}", e)))?;
        }

        let doc = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| StoreError::Io(format!("Failed to read store file: {}", e)))?;
            serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt(e.to_string()))?
        } else {
            Document::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Document>> {
        self.doc
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Rewrite the document atomically: serialize to a sibling temp file,
    /// then rename over the store path.
    fn persist(&self, doc: &Document) -> Result<()> {
        let contents = serde_json::to_string_pretty(doc)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)
            .map_err(|e| StoreError::Io(format!("Failed to write store file: {}", e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Io(format!("Failed to replace store file: {}", e)))?;

        Ok(())
    }
}

impl FallbackStore for JsonFileStore {
    fn get(&self, country: &str) -> Result<Option<StoredReading>> {
        Ok(self.lock()?.countries.get(country).cloned())
    }

    fn upsert(&self, country: &str, reading: &Reading) -> Result<()> {
        let mut doc = self.lock()?;

        // Last-write-wins by capture time: an out-of-order older write must
        // not clobber a fresher record.
        if let Some(existing) = doc.countries.get(country)
            && existing.timestamp > reading.timestamp
        {
            log::debug!(
                "Skipping upsert for {}: stored reading is newer ({} > {})",
                country,
                existing.timestamp,
                reading.timestamp
            );
            return Ok(());
        }

        let previous = doc
            .countries
            .insert(country.to_string(), StoredReading::from_reading(country, reading));

        if let Err(err) = self.persist(&doc) {
            // Failed write leaves prior state intact, in memory as on disk
            match previous {
                Some(prev) => doc.countries.insert(country.to_string(), prev),
                None => doc.countries.remove(country),
            };
            return Err(err);
        }

        Ok(())
    }

    fn latest_per_country(&self) -> Result<Vec<StoredReading>> {
        Ok(self.lock()?.countries.values().cloned().collect())
    }

    fn history(&self, city: &str, since: DateTime<Utc>) -> Result<Vec<StoredReading>> {
        Ok(self
            .lock()?
            .countries
            .values()
            .filter(|r| r.city.eq_ignore_ascii_case(city) && r.timestamp >= since)
            .cloned()
            .collect())
    }

    fn last_batch_date(&self) -> Result<Option<NaiveDate>> {
        Ok(self.lock()?.last_batch_date)
    }

    fn set_last_batch_date(&self, date: NaiveDate) -> Result<()> {
        let mut doc = self.lock()?;
        let previous = doc.last_batch_date.replace(date);

        if let Err(err) = self.persist(&doc) {
            doc.last_batch_date = previous;
            return Err(err);
        }
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let doc = self.lock()?;
        Ok(StoreStats {
            total_readings: doc.countries.len(),
            countries: doc.countries.len(),
            oldest: doc.countries.values().map(|r| r.timestamp).min(),
            newest: doc.countries.values().map(|r| r.timestamp).max(),
            last_batch_date: doc.last_batch_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn test_store() -> (JsonFileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open_at(&dir.path().join("fallback.json")).unwrap();
        (store, dir)
    }

    fn reading(city: &str, aqi: i64, timestamp: DateTime<Utc>) -> Reading {
        Reading {
            city: city.to_string(),
            aqi,
            lat: 52.5,
            lon: 13.4,
            timestamp,
        }
    }

    #[test]
    fn test_get_empty() {
        let (store, _dir) = test_store();
        assert_eq!(store.get("Germany").unwrap(), None);
    }

    #[test]
    fn test_upsert_then_get() {
        let (store, _dir) = test_store();
        store
            .upsert("Germany", &reading("Berlin", 42, Utc::now()))
            .unwrap();

        let stored = store.get("Germany").unwrap().unwrap();
        assert_eq!(stored.city, "Berlin");
        assert_eq!(stored.aqi, 42);
    }

    #[test]
    fn test_upsert_idempotent() {
        let (store, _dir) = test_store();
        let r = reading("Berlin", 42, Utc::now());

        store.upsert("Germany", &r).unwrap();
        let first = store.get("Germany").unwrap();
        store.upsert("Germany", &r).unwrap();

        assert_eq!(store.get("Germany").unwrap(), first);
        assert_eq!(store.stats().unwrap().total_readings, 1);
    }

    #[test]
    fn test_last_write_wins_by_timestamp() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        store.upsert("Germany", &reading("Berlin", 50, now)).unwrap();
        store
            .upsert("Germany", &reading("Berlin", 99, now - TimeDelta::hours(1)))
            .unwrap();

        assert_eq!(store.get("Germany").unwrap().unwrap().aqi, 50);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fallback.json");

        {
            let store = JsonFileStore::open_at(&path).unwrap();
            store
                .upsert("Germany", &reading("Berlin", 42, Utc::now()))
                .unwrap();
            store
                .set_last_batch_date(NaiveDate::from_ymd_opt(2026, 8, 6).unwrap())
                .unwrap();
        }

        let store = JsonFileStore::open_at(&path).unwrap();
        assert_eq!(store.get("Germany").unwrap().unwrap().aqi, 42);
        assert_eq!(
            store.last_batch_date().unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 6)
        );
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fallback.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let err = JsonFileStore::open_at(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_history_returns_latest_only() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        store
            .upsert("Germany", &reading("Berlin", 10, now - TimeDelta::hours(2)))
            .unwrap();
        store.upsert("Germany", &reading("Berlin", 20, now)).unwrap();

        let history = store.history("Berlin", now - TimeDelta::days(7)).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].aqi, 20);
    }

    #[test]
    fn test_latest_per_country() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        store.upsert("Germany", &reading("Berlin", 42, now)).unwrap();
        store.upsert("France", &reading("Paris", 30, now)).unwrap();

        let latest = store.latest_per_country().unwrap();
        assert_eq!(latest.len(), 2);
        // BTreeMap keys keep countries sorted
        assert_eq!(latest[0].country, "France");
        assert_eq!(latest[1].country, "Germany");
    }
}
