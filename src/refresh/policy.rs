//! Freshness decision for cached readings
//!
//! Pure function, no I/O: "is this data good enough" is decided here, "how do
//! we get new data" lives in the orchestrator. The threshold is supplied by
//! the caller, so interactive and scheduler paths can use different windows
//! without duplicating fetch logic.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::store::StoredReading;

/// Outcome of the freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The cached record is recent enough to serve as-is
    Reuse,
    /// No record, or the record's age has reached the window
    Refresh,
}

/// Decide whether a cached record may be reused at `now` under `max_age`.
///
/// Reuse iff a record exists and `now - record.timestamp < max_age`.
pub fn decide(record: Option<&StoredReading>, now: DateTime<Utc>, max_age: Duration) -> Decision {
    match record {
        Some(record) if record.age(now) < max_age => Decision::Reuse,
        _ => Decision::Refresh,
    }
}
