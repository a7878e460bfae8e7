//! Forecast command

use chrono::{TimeDelta, Utc};
use colored::Colorize;

use crate::aqi::AqiCategory;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::{Error, Result};
use crate::forecast::{Forecaster, TrendForecaster};
use crate::output::json::format_json;

/// Predict the AQI for a capital some hours ahead
pub fn run(
    name: &str,
    hours: i64,
    format: OutputFormat,
    config_override: Option<&str>,
) -> Result<()> {
    if hours <= 0 {
        return Err(Error::Other("--hours must be positive".to_string()));
    }

    let ctx = CommandContext::load(config_override)?;
    let capital = ctx
        .catalog
        .resolve(name)
        .ok_or_else(|| Error::UnknownCity(name.to_string()))?
        .clone();

    let forecaster = TrendForecaster::new(ctx.store.clone());
    let target = Utc::now() + TimeDelta::hours(hours);
    let point = forecaster.predict(&capital.city, target)?;

    match format {
        OutputFormat::Json => println!("{}", format_json(&point)?),
        OutputFormat::Table => {
            let rounded = point.aqi.round() as i64;
            let category = AqiCategory::from_aqi(rounded);
            println!(
                "{} in {}h ({}): predicted AQI {} - {}",
                capital.city.bold(),
                hours,
                point.at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                rounded,
                category.label()
            );
        }
    }

    Ok(())
}
