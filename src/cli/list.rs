//! List the latest stored reading per capital

use chrono::Utc;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::ReadingRow;
use crate::output::{json::format_json, table::format_table};

/// Show the latest stored reading per country, annotated with freshness
/// against the interactive window. No upstream calls are made.
pub fn run(format: OutputFormat, config_override: Option<&str>) -> Result<()> {
    let ctx = CommandContext::load(config_override)?;
    let readings = ctx.store.latest_per_country().map_err(crate::error::Error::from)?;

    let window = ctx.config.freshness.interactive();
    let now = Utc::now();

    let rows: Vec<ReadingRow> = readings
        .iter()
        .map(|reading| ReadingRow::from_stored(reading, reading.age(now) < window))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", format_json(&rows)?),
        OutputFormat::Table => println!("{}", format_table(&rows)),
    }

    Ok(())
}
