//! Output formatting for CLI results

pub mod json;
pub mod table;

use chrono::Utc;

use crate::aqi::AqiCategory;
use crate::refresh::{Outcome, format_age};
use crate::store::StoredReading;
use tabled::Tabled;

/// One display row for a country's reading.
///
/// The freshness column preserves the fresh / stale-with-age / no-data
/// distinction all the way to the terminal; it is never collapsed.
#[derive(Debug, Tabled, serde::Serialize)]
pub struct ReadingRow {
    #[tabled(rename = "COUNTRY")]
    pub country: String,
    #[tabled(rename = "CAPITAL")]
    pub city: String,
    #[tabled(rename = "AQI")]
    pub aqi: String,
    #[tabled(rename = "CATEGORY")]
    pub category: String,
    #[tabled(rename = "FRESHNESS")]
    pub freshness: String,
}

impl ReadingRow {
    /// Row for a stored reading; `fresh` selects the freshness wording
    pub fn from_stored(reading: &StoredReading, fresh: bool) -> Self {
        let freshness = if fresh {
            "fresh".to_string()
        } else {
            format!("stale ({} old)", format_age(reading.age(Utc::now())))
        };

        Self {
            country: reading.country.clone(),
            city: reading.city.clone(),
            aqi: reading.aqi.to_string(),
            category: AqiCategory::from_aqi(reading.aqi).label().to_string(),
            freshness,
        }
    }

    /// Row for a per-city refresh outcome
    pub fn from_outcome(country: &str, city: &str, outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Fetched(reading) => Self::from_stored(reading, true),
            Outcome::ReusedCache(reading) => Self::from_stored(reading, false),
            Outcome::Failed(_) => Self {
                country: country.to_string(),
                city: city.to_string(),
                aqi: "-".to_string(),
                category: "No Data".to_string(),
                freshness: "no value available".to_string(),
            },
        }
    }
}
