//! Manual full-batch refresh command

use std::time::Duration;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::ReadingRow;
use crate::output::{json::format_json, table::format_table};

/// Run a manual refresh over the whole capital catalog.
///
/// Always bypasses the once-a-day batch guard; cadence limiting is the
/// scheduler's concern, not the user's.
pub async fn run(
    format: OutputFormat,
    config_override: Option<&str>,
    stale_ok_mins: Option<u64>,
) -> Result<()> {
    let ctx = CommandContext::load(config_override)?;
    let refresher = ctx.refresher()?;

    let max_age = match stale_ok_mins {
        Some(mins) => Duration::from_secs(mins * 60),
        None => ctx.config.freshness.interactive(),
    };

    let cities = ctx.catalog.batch_pairs();
    let batch = refresher.refresh_batch(&cities, max_age, true).await;

    let rows: Vec<ReadingRow> = ctx
        .catalog
        .entries()
        .iter()
        .filter_map(|capital| {
            batch
                .outcomes
                .get(&capital.country)
                .map(|outcome| ReadingRow::from_outcome(&capital.country, &capital.city, outcome))
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", format_json(&rows)?),
        OutputFormat::Table => {
            println!("{}", format_table(&rows));
            println!(
                "{} fetched, {} reused, {} failed",
                batch.fetched_count(),
                batch.reused_count(),
                batch.failed_count()
            );
        }
    }

    Ok(())
}
