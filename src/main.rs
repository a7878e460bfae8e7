//! BreatheSafe CLI - AQI readings and forecasts for world capitals

use clap::Parser;

mod aqi;
mod catalog;
mod cli;
mod client;
mod config;
mod error;
mod forecast;
mod output;
mod refresh;
mod scheduler;
mod store;

use cli::{Cli, Commands, StoreCommands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => cli::init::run(config).await,
        Commands::Status => cli::status::run(cli.format, config),
        Commands::Refresh { stale_ok_mins } => {
            cli::refresh::run(cli.format, config, stale_ok_mins).await
        }
        Commands::List => cli::list::run(cli.format, config),
        Commands::City { name } => cli::city::run(&name, cli.format, config).await,
        Commands::Forecast { city, hours } => cli::forecast::run(&city, hours, cli.format, config),
        Commands::Watch => cli::watch::run(config).await,
        Commands::Store(store_cmd) => match store_cmd {
            StoreCommands::Stats => cli::store::stats(cli.format, config),
            StoreCommands::Path => cli::store::path(config),
        },
    }
}
