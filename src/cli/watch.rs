//! Foreground scheduler command

use colored::Colorize;
use std::sync::Arc;

use crate::cli::CommandContext;
use crate::error::Result;
use crate::scheduler::Scheduler;

/// Run the periodic batch scheduler until Ctrl+C.
///
/// Interactive commands in other terminals keep working while this runs;
/// they go through the same store interface as the scheduler's writes.
pub async fn run(config_override: Option<&str>) -> Result<()> {
    let ctx = CommandContext::load(config_override)?;
    let refresher = ctx.refresher()?;

    let scheduler = Arc::new(Scheduler::new(
        refresher,
        ctx.catalog.clone(),
        ctx.config.freshness.scheduler(),
        &ctx.config.scheduler.minute_offsets,
    ));
    scheduler.start();

    println!(
        "{} Refreshing {} capitals at minutes {:?} of every hour. Ctrl+C to stop.",
        "Scheduler running.".bold().green(),
        ctx.catalog.len(),
        ctx.config.scheduler.minute_offsets
    );

    tokio::signal::ctrl_c().await?;
    scheduler.shutdown();
    println!("\nStopped.");

    Ok(())
}
