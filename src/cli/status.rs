//! Status command implementation

use colored::Colorize;

use crate::cli::{CommandContext, OutputFormat};
use crate::config::{Config, StoreBackend};
use crate::error::Result;

/// Show configuration and store status
pub fn run(format: OutputFormat, config_override: Option<&str>) -> Result<()> {
    let ctx = CommandContext::load(config_override)?;
    let stats = ctx.store.stats().map_err(crate::error::Error::from)?;

    let backend = match ctx.config.store.backend {
        StoreBackend::Sqlite => "sqlite",
        StoreBackend::Json => "json",
    };
    let store_path = ctx.config.store_path()?;
    let token_set = ctx.config.require_token().is_ok();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "config_path": match config_override {
                    Some(p) => p.to_string(),
                    None => Config::default_path()?.display().to_string(),
                },
                "api_token_configured": token_set,
                "store_backend": backend,
                "store_path": store_path.display().to_string(),
                "capitals": ctx.catalog.len(),
                "readings": stats.total_readings,
                "countries": stats.countries,
                "oldest_reading": stats.oldest.map(|t| t.to_rfc3339()),
                "newest_reading": stats.newest.map(|t| t.to_rfc3339()),
                "last_batch_date": stats.last_batch_date.map(|d| d.to_string()),
                "freshness_interactive_mins": ctx.config.freshness.interactive_mins,
                "freshness_scheduler_mins": ctx.config.freshness.scheduler_mins,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("{}", "BreatheSafe Status".bold());
            println!("────────────────────────────────────────");
            println!(
                "API token:      {}",
                if token_set {
                    "configured".green()
                } else {
                    "missing (run `breathesafe init`)".red()
                }
            );
            println!("Store backend:  {}", backend);
            println!("Store path:     {}", store_path.display());
            println!("Capitals:       {}", ctx.catalog.len());
            println!("Readings:       {}", stats.total_readings);
            println!("Countries:      {}", stats.countries);
            if let Some(newest) = stats.newest {
                println!(
                    "Newest reading: {}",
                    newest.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                );
            }
            if let Some(date) = stats.last_batch_date {
                println!("Last batch:     {}", date);
            }
            println!(
                "Freshness:      {}m interactive / {}m scheduler",
                ctx.config.freshness.interactive_mins, ctx.config.freshness.scheduler_mins
            );
        }
    }

    Ok(())
}
