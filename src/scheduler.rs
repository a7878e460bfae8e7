//! Periodic background refresh of the full capital batch
//!
//! A single tokio task fires at fixed wall-clock minute offsets within each
//! hour and runs the same orchestrator every interactive caller uses; there
//! is no separate code path for scheduler writes.

use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::catalog::CapitalCatalog;
use crate::refresh::Refresher;

/// Periodic batch scheduler
pub struct Scheduler {
    refresher: Arc<Refresher>,
    catalog: Arc<CapitalCatalog>,
    max_age: Duration,
    minute_offsets: Vec<u32>,
    started: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(
        refresher: Arc<Refresher>,
        catalog: Arc<CapitalCatalog>,
        max_age: Duration,
        minute_offsets: &[u32],
    ) -> Self {
        let mut offsets: Vec<u32> = minute_offsets.iter().copied().filter(|m| *m < 60).collect();
        offsets.sort_unstable();
        offsets.dedup();
        if offsets.is_empty() {
            offsets = vec![0, 15, 30, 45];
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            refresher,
            catalog,
            max_age,
            minute_offsets: offsets,
            started: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Start the background loop.
    ///
    /// Idempotent: the first call spawns the loop and returns true, any
    /// further call is a no-op returning false. Multiple interactive callers
    /// can therefore race on start without spawning a second loop.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            log::warn!("Scheduler already running, ignoring start");
            return false;
        }

        let refresher = self.refresher.clone();
        let cities = self.catalog.batch_pairs();
        let max_age = self.max_age;
        let offsets = self.minute_offsets.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            log::info!(
                "Scheduler started: {} capitals at minutes {:?}",
                cities.len(),
                offsets
            );

            loop {
                let delay = next_tick_delay(Utc::now(), &offsets);
                log::debug!("Next scheduled refresh in {}s", delay.as_secs());

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        let batch = refresher.refresh_batch(&cities, max_age, false).await;
                        log::info!(
                            "Scheduled refresh: {} fetched, {} reused, {} failed",
                            batch.fetched_count(),
                            batch.reused_count(),
                            batch.failed_count()
                        );
                    }
                    _ = shutdown_rx.recv() => {
                        log::info!("Scheduler stopped");
                        break;
                    }
                }
            }
        });

        true
    }

    /// Signal the background loop to stop after its current wait or batch
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Seconds until the next configured minute offset, strictly in the future.
///
/// `offsets` must be sorted, deduplicated and within 0..60 (the constructor
/// guarantees this). Landing exactly on an offset schedules the following
/// one, never an immediate re-fire.
fn next_tick_delay(now: DateTime<Utc>, offsets: &[u32]) -> Duration {
    let into_hour = now.minute() * 60 + now.second();

    let mut best = u32::MAX;
    for &minute in offsets {
        let target = minute * 60;
        let delta = if target > into_hour {
            target - into_hour
        } else {
            target + 3600 - into_hour
        };
        best = best.min(delta);
    }

    if best == u32::MAX {
        best = 3600;
    }
    Duration::from_secs(best.into())
}
