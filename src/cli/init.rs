//! Init command implementation

use colored::Colorize;
use dialoguer::{Password, Select, theme::ColorfulTheme};

use crate::client::{AqiApi, WaqiClient};
use crate::config::{Config, StoreBackend};
use crate::error::Result;

/// Probe city used to validate the token during setup
const PROBE_CITY: &str = "Berlin";

/// Run the init command
pub async fn run(config_override: Option<&str>) -> Result<()> {
    println!("{}", "Welcome to BreatheSafe!".bold().green());
    println!("Let's set up your WAQI configuration.\n");

    // Prompt for the API token
    let api_token: String = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter your WAQI API token")
        .interact()?;

    // Validate the token with a probe fetch
    println!("\n{}", "Checking the token against the WAQI feed...".cyan());
    let client = WaqiClient::new(api_token.clone())?;
    let reading = client.fetch(PROBE_CITY).await?;
    println!(
        "{} Token works ({} currently reports AQI {})",
        "✓".green(),
        PROBE_CITY,
        reading.aqi
    );

    // Choose the fallback store backend
    let backends = ["sqlite (keeps reading history)", "json (latest reading only)"];
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the fallback store backend")
        .items(&backends)
        .default(0)
        .interact()?;

    let mut config = Config::load(config_override).unwrap_or_default();
    config.api_token = Some(api_token);
    config.store.backend = if selection == 1 {
        StoreBackend::Json
    } else {
        StoreBackend::Sqlite
    };

    config.save(config_override)?;

    let config_path = match config_override {
        Some(p) => std::path::PathBuf::from(p),
        None => Config::default_path()?,
    };
    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        config_path.display()
    );

    println!("\n{}", "You're all set! Try running:".bold());
    println!(
        "  {} - Refresh AQI data for all capitals",
        "breathesafe refresh".cyan()
    );
    println!(
        "  {} - Show the latest readings",
        "breathesafe list".cyan()
    );
    println!(
        "  {} - Keep the data fresh in the background",
        "breathesafe watch".cyan()
    );

    Ok(())
}
