//! SQLite-backed fallback store with full reading history
//!
//! Readings are appended, never updated in place; "latest per country" is a
//! query. Last-write-wins by timestamp therefore holds structurally: whichever
//! writer carries the later capture time is the one the latest-query returns.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;

use super::{FallbackStore, StoreStats, StoredReading};
use crate::client::Reading;
use crate::error::StoreError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

/// Meta table key for the batch-guard marker
const META_LAST_BATCH_DATE: &str = "last_batch_date";

type Result<T> = std::result::Result<T, StoreError>;

/// SQLite-backed fallback store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at a specific database path
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create store dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Store schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(path)
                .map_err(|e| StoreError::Io(format!("Failed to remove store DB: {}", e)))?;
            return Self::open_at(path);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                country TEXT NOT NULL,
                city TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                aqi INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                UNIQUE(country, timestamp)
            );

            CREATE INDEX IF NOT EXISTS idx_readings_country_ts ON readings(country, timestamp);
            CREATE INDEX IF NOT EXISTS idx_readings_city_ts ON readings(city, timestamp);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn row_to_reading(
        country: String,
        city: String,
        lat: f64,
        lon: f64,
        aqi: i64,
        timestamp: i64,
    ) -> Result<StoredReading> {
        let timestamp = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| StoreError::Corrupt(format!("bad stored timestamp {}", timestamp)))?;
        Ok(StoredReading {
            country,
            city,
            aqi,
            lat,
            lon,
            timestamp,
        })
    }
}

type ReadingRow = (String, String, f64, f64, i64, i64);

impl FallbackStore for SqliteStore {
    fn get(&self, country: &str) -> Result<Option<StoredReading>> {
        let conn = self.lock()?;
        let row: Option<ReadingRow> = conn
            .query_row(
                "SELECT country, city, lat, lon, aqi, timestamp FROM readings
                 WHERE country = ?1 ORDER BY timestamp DESC LIMIT 1",
                [country],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(country, city, lat, lon, aqi, ts)| {
            Self::row_to_reading(country, city, lat, lon, aqi, ts)
        })
        .transpose()
    }

    fn upsert(&self, country: &str, reading: &Reading) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        // Identical (country, capture-time) pairs are the same observation;
        // re-applying them is a no-op rather than a duplicate row.
        tx.execute(
            "INSERT OR IGNORE INTO readings (country, city, lat, lon, aqi, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                country,
                reading.city,
                reading.lat,
                reading.lon,
                reading.aqi,
                reading.timestamp.timestamp()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn latest_per_country(&self) -> Result<Vec<StoredReading>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT r.country, r.city, r.lat, r.lon, r.aqi, r.timestamp
             FROM readings r
             JOIN (SELECT country, MAX(timestamp) AS ts FROM readings GROUP BY country) m
               ON r.country = m.country AND r.timestamp = m.ts
             ORDER BY r.country",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut readings = Vec::new();
        for row in rows {
            let (country, city, lat, lon, aqi, ts) = row?;
            readings.push(Self::row_to_reading(country, city, lat, lon, aqi, ts)?);
        }
        Ok(readings)
    }

    fn history(&self, city: &str, since: DateTime<Utc>) -> Result<Vec<StoredReading>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT country, city, lat, lon, aqi, timestamp FROM readings
             WHERE city = ?1 COLLATE NOCASE AND timestamp >= ?2
             ORDER BY timestamp ASC",
        )?;

        let rows = stmt.query_map(params![city, since.timestamp()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?;

        let mut readings = Vec::new();
        for row in rows {
            let (country, city, lat, lon, aqi, ts) = row?;
            readings.push(Self::row_to_reading(country, city, lat, lon, aqi, ts)?);
        }
        Ok(readings)
    }

    fn last_batch_date(&self) -> Result<Option<NaiveDate>> {
        let conn = self.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                [META_LAST_BATCH_DATE],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                v.parse::<NaiveDate>()
                    .map_err(|e| StoreError::Corrupt(format!("bad batch date {:?}: {}", v, e)))
            })
            .transpose()
    }

    fn set_last_batch_date(&self, date: NaiveDate) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![META_LAST_BATCH_DATE, date.to_string()],
        )?;
        Ok(())
    }

    fn stats(&self) -> Result<StoreStats> {
        let last_batch_date = self.last_batch_date()?;
        let conn = self.lock()?;

        let total_readings: i64 =
            conn.query_row("SELECT COUNT(*) FROM readings", [], |r| r.get(0))?;

        let countries: i64 =
            conn.query_row("SELECT COUNT(DISTINCT country) FROM readings", [], |r| {
                r.get(0)
            })?;

        let oldest: Option<i64> = conn
            .query_row("SELECT MIN(timestamp) FROM readings", [], |r| r.get(0))
            .optional()?
            .flatten();

        let newest: Option<i64> = conn
            .query_row("SELECT MAX(timestamp) FROM readings", [], |r| r.get(0))
            .optional()?
            .flatten();

        Ok(StoreStats {
            total_readings: total_readings as usize,
            countries: countries as usize,
            oldest: oldest.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            newest: newest.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            last_batch_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open_at(&dir.path().join("readings.db")).unwrap();
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
        let ts = Utc::now();

        store.upsert("Germany", &reading("Berlin", 42, ts)).unwrap();

        let stored = store.get("Germany").unwrap().unwrap();
        assert_eq!(stored.country, "Germany");
        assert_eq!(stored.city, "Berlin");
        assert_eq!(stored.aqi, 42);
        assert_eq!(stored.timestamp.timestamp(), ts.timestamp());
    }

    #[test]
    fn test_upsert_idempotent() {
        let (store, _dir) = test_store();
        let r = reading("Berlin", 42, Utc::now());

        store.upsert("Germany", &r).unwrap();
        store.upsert("Germany", &r).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_readings, 1);
    }

    #[test]
    fn test_last_write_wins_by_timestamp() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        // Later capture time arrives first; the out-of-order older write
        // must not become "latest".
        store.upsert("Germany", &reading("Berlin", 50, now)).unwrap();
        store
            .upsert("Germany", &reading("Berlin", 99, now - TimeDelta::hours(1)))
            .unwrap();

        let stored = store.get("Germany").unwrap().unwrap();
        assert_eq!(stored.aqi, 50);
    }

    #[test]
    fn test_latest_per_country() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        store
            .upsert("Germany", &reading("Berlin", 10, now - TimeDelta::hours(1)))
            .unwrap();
        store.upsert("Germany", &reading("Berlin", 20, now)).unwrap();
        store.upsert("France", &reading("Paris", 30, now)).unwrap();

        let latest = store.latest_per_country().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].country, "France");
        assert_eq!(latest[1].country, "Germany");
        assert_eq!(latest[1].aqi, 20);
    }

    #[test]
    fn test_history_order_and_cutoff() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        store
            .upsert("Germany", &reading("Berlin", 10, now - TimeDelta::days(10)))
            .unwrap();
        store
            .upsert("Germany", &reading("Berlin", 20, now - TimeDelta::hours(2)))
            .unwrap();
        store
            .upsert("Germany", &reading("Berlin", 30, now - TimeDelta::hours(1)))
            .unwrap();

        let history = store.history("Berlin", now - TimeDelta::days(7)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].aqi, 20);
        assert_eq!(history[1].aqi, 30);
    }

    #[test]
    fn test_history_city_case_insensitive() {
        let (store, _dir) = test_store();
        let now = Utc::now();
        store.upsert("Germany", &reading("Berlin", 42, now)).unwrap();

        let history = store.history("berlin", now - TimeDelta::days(1)).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_batch_date_roundtrip() {
        let (store, _dir) = test_store();
        assert_eq!(store.last_batch_date().unwrap(), None);

        let date = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        store.set_last_batch_date(date).unwrap();
        assert_eq!(store.last_batch_date().unwrap(), Some(date));

        // Overwrite with a later date
        let next = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        store.set_last_batch_date(next).unwrap();
        assert_eq!(store.last_batch_date().unwrap(), Some(next));
    }

    #[test]
    fn test_stats() {
        let (store, _dir) = test_store();
        let now = Utc::now();

        store.upsert("Germany", &reading("Berlin", 42, now)).unwrap();
        store.upsert("France", &reading("Paris", 30, now)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_readings, 2);
        assert_eq!(stats.countries, 2);
        assert!(stats.oldest.is_some());
        assert!(stats.newest.is_some());
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("readings.db");
        let ts = Utc::now();

        {
            let store = SqliteStore::open_at(&path).unwrap();
            store.upsert("Germany", &reading("Berlin", 42, ts)).unwrap();
        }

        let store = SqliteStore::open_at(&path).unwrap();
        assert_eq!(store.get("Germany").unwrap().unwrap().aqi, 42);
    }
}
