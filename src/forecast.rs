//! Forecasting collaborator over stored reading history
//!
//! The core treats forecasting as opaque: train on readings from the
//! fallback store, predict a value for a target instant, and fail cleanly
//! for targets outside the trained range. `TrendForecaster` is a linear
//! trend fit; a heavier model can replace it behind the same trait.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{Error, ForecastError, Result};
use crate::store::{FallbackStore, StoredReading};

/// One predicted value
#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub city: String,
    pub at: DateTime<Utc>,
    pub aqi: f64,
}

/// Forecasting collaborator contract
pub trait Forecaster: Send + Sync {
    /// Predict the AQI for a city at a target instant
    fn predict(&self, city: &str, target: DateTime<Utc>) -> Result<ForecastPoint>;
}

/// Minimum training samples before a prediction is attempted
const MIN_SAMPLES: usize = 10;

/// How far back training data is read
const HISTORY_DAYS: i64 = 30;

/// Least-squares linear trend over stored history
pub struct TrendForecaster {
    store: Arc<dyn FallbackStore>,
}

impl TrendForecaster {
    pub fn new(store: Arc<dyn FallbackStore>) -> Self {
        Self { store }
    }

    /// Fit `aqi = intercept + slope * seconds_since_first` over the samples
    fn fit(history: &[StoredReading]) -> (f64, f64, DateTime<Utc>) {
        let t0 = history[0].timestamp;
        let points: Vec<(f64, f64)> = history
            .iter()
            .map(|r| ((r.timestamp - t0).num_seconds() as f64, r.aqi as f64))
            .collect();

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let var_x = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum::<f64>();
        let cov = points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum::<f64>();

        // All samples at one instant degenerate to the mean
        let slope = if var_x == 0.0 { 0.0 } else { cov / var_x };
        let intercept = mean_y - slope * mean_x;

        (intercept, slope, t0)
    }
}

impl Forecaster for TrendForecaster {
    fn predict(&self, city: &str, target: DateTime<Utc>) -> Result<ForecastPoint> {
        let since = Utc::now() - TimeDelta::days(HISTORY_DAYS);
        let history = self.store.history(city, since)?;

        if history.len() < MIN_SAMPLES {
            return Err(Error::Forecast(ForecastError::NotEnoughData {
                city: city.to_string(),
                have: history.len(),
                need: MIN_SAMPLES,
            }));
        }

        // history is oldest-first; predictions must lie beyond the trained range
        let last = history
            .last()
            .map(|r| r.timestamp)
            .unwrap_or_else(Utc::now);
        if target <= last {
            return Err(Error::Forecast(ForecastError::TargetInTrainedRange));
        }

        let (intercept, slope, t0) = Self::fit(&history);
        let x = (target - t0).num_seconds() as f64;
        let aqi = (intercept + slope * x).max(0.0);

        Ok(ForecastPoint {
            city: city.to_string(),
            at: target,
            aqi,
        })
    }
}
