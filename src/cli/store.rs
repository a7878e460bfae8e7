//! Fallback store inspection commands

use crate::cli::{CommandContext, OutputFormat};
use crate::config::Config;
use crate::error::Result;

/// Show store statistics
pub fn stats(format: OutputFormat, config_override: Option<&str>) -> Result<()> {
    let ctx = CommandContext::load(config_override)?;
    let stats = ctx.store.stats().map_err(crate::error::Error::from)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": ctx.config.store_path()?.display().to_string(),
                "readings": stats.total_readings,
                "countries": stats.countries,
                "oldest": stats.oldest.map(|t| t.to_rfc3339()),
                "newest": stats.newest.map(|t| t.to_rfc3339()),
                "last_batch_date": stats.last_batch_date.map(|d| d.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("Fallback Store");
            println!("────────────────────────────────────────");
            println!("Location:   {}", ctx.config.store_path()?.display());
            println!("Readings:   {}", stats.total_readings);
            println!("Countries:  {}", stats.countries);

            if let Some(oldest) = stats.oldest {
                println!(
                    "Oldest:     {}",
                    oldest.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                );
            }
            if let Some(newest) = stats.newest {
                println!(
                    "Newest:     {}",
                    newest.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                );
            }
            if let Some(date) = stats.last_batch_date {
                println!("Last batch: {}", date);
            }
        }
    }

    Ok(())
}

/// Print the store file path
pub fn path(config_override: Option<&str>) -> Result<()> {
    let config = Config::load(config_override).unwrap_or_default();
    println!("{}", config.store_path()?.display());
    Ok(())
}
