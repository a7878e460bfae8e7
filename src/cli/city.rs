//! Single-capital lookup command

use chrono::Utc;
use colored::Colorize;

use crate::aqi::{AqiCategory, colorize_aqi};
use crate::cli::{CommandContext, OutputFormat};
use crate::error::{Error, Result};
use crate::output::ReadingRow;
use crate::output::json::format_json;
use crate::refresh::{Outcome, format_age};

/// Show the current AQI for one capital, fetching when the cached reading
/// has aged out of the interactive window.
pub async fn run(name: &str, format: OutputFormat, config_override: Option<&str>) -> Result<()> {
    let ctx = CommandContext::load(config_override)?;

    let capital = ctx
        .catalog
        .resolve(name)
        .ok_or_else(|| Error::UnknownCity(name.to_string()))?
        .clone();

    let refresher = ctx.refresher()?;
    let outcome = refresher
        .refresh_city(&capital.city, &capital.country, ctx.config.freshness.interactive())
        .await;

    if let OutputFormat::Json = format {
        let row = ReadingRow::from_outcome(&capital.country, &capital.city, &outcome);
        println!("{}", format_json(&row)?);
        return Ok(());
    }

    match outcome {
        Outcome::Fetched(reading) | Outcome::ReusedCache(reading) => {
            let category = AqiCategory::from_aqi(reading.aqi);
            let age = reading.age(Utc::now());

            println!(
                "{} ({}, {})",
                reading.city.bold(),
                reading.country,
                capital.continent
            );
            println!(
                "AQI {} - {}",
                colorize_aqi(reading.aqi),
                category.label()
            );
            println!("{}", category.advice());
            if age.as_secs() < 60 {
                println!("{}", "Reading is fresh.".dimmed());
            } else {
                println!("{}", format!("Reading is {} old.", format_age(age)).dimmed());
            }
        }
        Outcome::Failed(reason) => {
            return Err(Error::Other(format!(
                "No data available for {} ({}): {}",
                capital.city, capital.country, reason
            )));
        }
    }

    Ok(())
}
