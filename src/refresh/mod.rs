//! Refresh orchestration: decide, fetch, store, report
//!
//! Every caller funnels through here: the manual refresh command, the
//! periodic scheduler and single-city lookups. Per city the sequence is
//! bounded by one upstream fetch (under a watchdog) and one store write.

use chrono::{Local, Utc};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::client::AqiApi;
use crate::store::{FallbackStore, StoredReading};

pub mod policy;

pub use policy::{Decision, decide};

/// Upper bound on one upstream fetch inside a batch, so a hung call cannot
/// stall the scheduler's next tick. Deliberately wider than the HTTP client's
/// own request timeout.
const FETCH_WATCHDOG: Duration = Duration::from_secs(15);

/// Concurrent in-flight refreshes within one batch. Refreshes for different
/// countries are independent; the store linearizes same-country writers.
const BATCH_CONCURRENCY: usize = 4;

/// Per-city result of a refresh attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Fresh value fetched from upstream and persisted
    Fetched(StoredReading),
    /// Cached value served, either fresh-enough or as stale fallback after
    /// an upstream failure; the record carries its own capture time
    ReusedCache(StoredReading),
    /// No cache and no successful fetch
    Failed(String),
}

/// Aggregated result of one batch run
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Per-country outcomes, keyed by country
    pub outcomes: BTreeMap<String, Outcome>,
    /// True when the calendar-day guard answered from the store instead of
    /// running the batch
    pub guard_skipped: bool,
}

impl BatchOutcome {
    pub fn fetched_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, Outcome::Fetched(_)))
            .count()
    }

    pub fn reused_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, Outcome::ReusedCache(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, Outcome::Failed(_)))
            .count()
    }
}

/// Refresh orchestrator.
///
/// Owns no reading state of its own; the fallback store is the single shared
/// resource and the orchestrator holds it only through the synchronized
/// trait interface, the same one every other caller uses.
pub struct Refresher {
    client: Arc<dyn AqiApi>,
    store: Arc<dyn FallbackStore>,
}

impl Refresher {
    pub fn new(client: Arc<dyn AqiApi>, store: Arc<dyn FallbackStore>) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &Arc<dyn FallbackStore> {
        &self.store
    }

    /// Refresh one city, preferring the cache within `max_age` and falling
    /// back to it when upstream fails.
    ///
    /// All failure modes are folded into the returned outcome; the batch
    /// variant relies on this never propagating an error.
    pub async fn refresh_city(&self, city: &str, country: &str, max_age: Duration) -> Outcome {
        let record = match self.store.get(country) {
            Ok(record) => record,
            Err(err) => {
                // Read failure is terminal for this city; there is nothing
                // to fall back to.
                log::warn!("Store read failed for {}: {}", country, err);
                return Outcome::Failed(format!("storage read failed: {}", err));
            }
        };

        if decide(record.as_ref(), Utc::now(), max_age) == Decision::Reuse
            && let Some(record) = record.as_ref()
        {
            log::debug!("Reusing cached reading for {} ({})", city, country);
            return Outcome::ReusedCache(record.clone());
        }

        let fetched = match tokio::time::timeout(FETCH_WATCHDOG, self.client.fetch(city)).await {
            Ok(Ok(reading)) if reading.is_storable() => Ok(reading),
            Ok(Ok(reading)) => {
                log::warn!(
                    "Discarding partial reading for {}: aqi={} lat={} lon={}",
                    city,
                    reading.aqi,
                    reading.lat,
                    reading.lon
                );
                Err(format!("partial payload for {}", city))
            }
            Ok(Err(err)) => {
                log::warn!("Upstream fetch failed for {}: {}", city, err);
                Err(err.to_string())
            }
            Err(_) => {
                log::warn!("Upstream fetch for {} exceeded the watchdog", city);
                Err(format!("fetch watchdog expired for {}", city))
            }
        };

        match fetched {
            Ok(reading) => {
                let stored = StoredReading::from_reading(country, &reading);
                if let Err(err) = self.store.upsert(country, &reading) {
                    // Write failure aborts only this city's persistence; the
                    // fetched value is still the freshest one we have.
                    log::warn!("Store write failed for {}: {}", country, err);
                }
                Outcome::Fetched(stored)
            }
            Err(reason) => match record {
                // Stale-but-available beats nothing
                Some(record) => {
                    log::info!(
                        "Falling back to cached reading for {} ({} old)",
                        city,
                        format_age(record.age(Utc::now()))
                    );
                    Outcome::ReusedCache(record)
                }
                None => Outcome::Failed(reason),
            },
        }
    }

    /// Refresh a batch of `(city, country)` pairs.
    ///
    /// Individual failures are isolated: the batch always produces one
    /// outcome per requested city. A completed pass records today's date;
    /// a later same-day batch answers from the store unless `force` is set
    /// (the manual refresh path forces, the scheduler does not).
    pub async fn refresh_batch(
        &self,
        cities: &[(String, String)],
        max_age: Duration,
        force: bool,
    ) -> BatchOutcome {
        let today = Local::now().date_naive();

        if !force {
            match self.store.last_batch_date() {
                Ok(Some(date)) if date == today => {
                    log::info!("Batch already completed today ({}), serving stored data", date);
                    return self.batch_from_store(cities);
                }
                Ok(_) => {}
                Err(err) => {
                    // An unreadable guard marker only costs us a redundant
                    // batch run.
                    log::warn!("Could not read last batch date: {}", err);
                }
            }
        }

        log::info!("Refreshing AQI data for {} capitals", cities.len());

        let results: Vec<(String, Outcome)> = stream::iter(cities.to_vec().into_iter().map(|pair| {
            let (city, country) = pair;
            async move {
                let outcome = self.refresh_city(&city, &country, max_age).await;
                (country, outcome)
            }
        }))
        .buffer_unordered(BATCH_CONCURRENCY)
        .collect()
        .await;

        let mut batch = BatchOutcome::default();
        for (country, outcome) in results {
            batch.outcomes.insert(country, outcome);
        }

        // A pass that fetched nothing (upstream fully down) must not mark the
        // day as done, or the next tick would serve yesterday's data all day.
        if batch.fetched_count() > 0
            && let Err(err) = self.store.set_last_batch_date(today)
        {
            log::warn!("Could not record batch date: {}", err);
        }

        log::info!(
            "Batch done: {} fetched, {} reused, {} failed",
            batch.fetched_count(),
            batch.reused_count(),
            batch.failed_count()
        );

        batch
    }

    /// Answer a guard-skipped batch from the store's latest records
    fn batch_from_store(&self, cities: &[(String, String)]) -> BatchOutcome {
        let latest: BTreeMap<String, StoredReading> = match self.store.latest_per_country() {
            Ok(records) => records.into_iter().map(|r| (r.country.clone(), r)).collect(),
            Err(err) => {
                log::warn!("Store read failed while serving guarded batch: {}", err);
                BTreeMap::new()
            }
        };

        let mut batch = BatchOutcome {
            guard_skipped: true,
            ..Default::default()
        };
        for (_, country) in cities {
            let outcome = match latest.get(country) {
                Some(record) => Outcome::ReusedCache(record.clone()),
                None => Outcome::Failed(format!("no stored reading for {}", country)),
            };
            batch.outcomes.insert(country.clone(), outcome);
        }
        batch
    }
}

/// Render a duration as a compact human age ("42m", "3h 07m")
pub fn format_age(age: Duration) -> String {
    let mins = age.as_secs() / 60;
    if mins < 60 {
        format!("{}m", mins)
    } else {
        format!("{}h {:02}m", mins / 60, mins % 60)
    }
}
