mod commands;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use irrigation_client_rs::DEFAULT_SETTINGS_FILE;

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Fetch and print the status of every switch
    Status,
    /// Turn a switch on
    On {
        #[arg(long)]
        switch: String,
    },
    /// Turn a switch off
    Off {
        #[arg(long)]
        switch: String,
    },
    /// Keep polling and print every change until interrupted
    Watch {
        /// Seconds between two refreshes
        #[arg(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
    /// Store host, login and switch names in the settings file
    Configure {
        /// Switch name as INDEX=NAME, INDEX starting at 1 (repeatable)
        #[arg(long = "name", value_parser = utils::parse_switch_name)]
        names: Vec<(usize, String)>,
    },
}

#[derive(Parser, Debug)]
#[command(version, about = "Toggle and poll irrigation relays")]
pub struct Params {
    /// Settings file
    #[clap(long, env = "IRRIGATION_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// Controller host, optionally with port (overrides the settings file)
    #[clap(long, env = "IRRIGATION_HOST")]
    host: Option<String>,
    /// User name (overrides the settings file)
    #[clap(long, env = "IRRIGATION_USER")]
    user: Option<String>,
    /// Password (overrides the settings file)
    #[clap(long, env = "IRRIGATION_PASSWORD")]
    password: Option<String>,
    /// Request timeout in seconds
    #[clap(long, default_value = "60")]
    timeout: u64,
    /// Talk plain HTTP instead of HTTPS
    #[clap(long)]
    plain_http: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let params = Params::parse();

    tracing_subscriber::fmt()
        .with_env_filter(utils::log_filter())
        .with_writer(std::io::stderr)
        .init();

    match params.command.clone() {
        Commands::Status => commands::status(params).await?,
        Commands::On { switch } => commands::switch_command(params, &switch, true).await?,
        Commands::Off { switch } => commands::switch_command(params, &switch, false).await?,
        Commands::Watch { interval } => commands::watch(params, interval).await?,
        Commands::Configure { names } => commands::configure(params, names)?,
    }

    Ok(())
}
