//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
use std::sync::Arc;

pub mod city;
pub mod forecast;
pub mod init;
pub mod list;
pub mod refresh;
pub mod status;
pub mod store;
pub mod watch;

use crate::catalog::CapitalCatalog;
use crate::client::WaqiClient;
use crate::config::Config;
use crate::error::Result;
use crate::refresh::Refresher;
use crate::store::FallbackStore;

/// Output format options
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Table format - one row per capital (default)
    #[default]
    Table,
    /// JSON format - structured for scripts
    Json,
}

/// BreatheSafe CLI - AQI readings and forecasts for world capitals
#[derive(Parser, Debug)]
#[command(name = "breathesafe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "BREATHESAFE_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "BREATHESAFE_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "BREATHESAFE_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize BreatheSafe configuration
    Init,

    /// Show configuration and store status
    Status,

    /// Refresh AQI data for all capitals now.
    ///
    /// This is the manual update path: it always bypasses the once-a-day
    /// batch guard that the background scheduler respects.
    Refresh {
        /// Reuse cached readings younger than this many minutes instead of
        /// re-fetching (defaults to the configured interactive window)
        #[arg(long)]
        stale_ok_mins: Option<u64>,
    },

    /// Show the latest stored reading per capital
    List,

    /// Show the current AQI for one capital, fetching if the cache is stale
    City {
        /// Capital city or country name
        name: String,
    },

    /// Predict the AQI for a capital at a future instant
    Forecast {
        /// Capital city or country name
        city: String,

        /// Hours ahead to predict
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },

    /// Run the periodic refresh scheduler in the foreground until Ctrl+C
    Watch,

    /// Inspect the fallback store
    #[command(subcommand)]
    Store(StoreCommands),
}

/// Fallback store subcommands
#[derive(Subcommand, Debug)]
pub enum StoreCommands {
    /// Show store statistics
    Stats,
    /// Print the store file path
    Path,
}

/// Shared state for commands that touch the store or the upstream API.
///
/// Built per invocation; nothing here is global, so tests can assemble the
/// same pieces around temporary stores.
pub struct CommandContext {
    pub config: Config,
    pub catalog: Arc<CapitalCatalog>,
    pub store: Arc<dyn FallbackStore>,
}

impl CommandContext {
    /// Load config and open the configured store
    pub fn load(config_override: Option<&str>) -> Result<Self> {
        let config = Config::load(config_override)?;
        let store = crate::store::open(&config)?;
        Ok(Self {
            config,
            catalog: Arc::new(CapitalCatalog::load()),
            store,
        })
    }

    /// Build the refresh orchestrator over the live WAQI client.
    ///
    /// `BREATHESAFE_API_HOST` overrides the provider base URL (used by the
    /// HTTP-level CLI tests).
    pub fn refresher(&self) -> Result<Arc<Refresher>> {
        let token = self.config.require_token()?;
        let client = match std::env::var("BREATHESAFE_API_HOST") {
            Ok(host) => Arc::new(WaqiClient::with_base_url(token, host)?),
            Err(_) => Arc::new(WaqiClient::new(token)?),
        };
        Ok(Arc::new(Refresher::new(client, self.store.clone())))
    }
}
