mod app;
mod logging;
mod settings_form;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;
use irrigation_client_rs::{
    DEFAULT_SETTINGS_FILE, Scheme, Settings, SettingsStore, SwitchController,
};
use logging::{LogConfig, RotationPeriod, setup_file_logging};
use tracing::{info, warn};

use crate::app::App;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal controller for irrigation relays")]
struct Params {
    /// Settings file
    #[clap(long, env = "IRRIGATION_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,
    /// Request timeout in seconds
    #[clap(long, default_value = "60")]
    timeout: u64,
    /// Talk plain HTTP instead of HTTPS
    #[clap(long)]
    plain_http: bool,
    /// Seconds between two automatic refreshes
    #[clap(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..))]
    refresh_interval: u64,
    /// Directory for log files (logging is off when not set)
    #[clap(long)]
    log_dir: Option<PathBuf>,
    /// Log rotation
    #[clap(long, value_enum, default_value = "daily")]
    log_rotation: RotationPeriod,
    /// Number of log files to keep (0 keeps all)
    #[clap(long, default_value = "7")]
    max_log_files: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().map_err(|e| anyhow!("Failed to install color-eyre: {e}"))?;
    let params = Params::parse();

    let _log_guard = match &params.log_dir {
        Some(dir) => Some(setup_file_logging(&LogConfig {
            log_dir: dir.clone(),
            rotation: params.log_rotation,
            max_log_files: params.max_log_files,
        })?),
        None => None,
    };

    let store = SettingsStore::new(&params.settings);
    let settings = store.load().unwrap_or_else(|e| {
        warn!("Failed to read settings, using defaults: {e}");
        Settings::default()
    });
    let scheme = if params.plain_http {
        Scheme::Http
    } else {
        Scheme::Https
    };
    let controller =
        SwitchController::from_settings(&settings, scheme, Duration::from_secs(params.timeout))?;
    info!(
        "Starting with {} switches, settings at {}",
        controller.board().len(),
        store.path().display()
    );

    let app = App::new(controller, store, settings);
    let terminal = ratatui::init();
    let result = app
        .run(terminal, Duration::from_secs(params.refresh_interval))
        .await;
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let params = Params::try_parse_from(["irrigation-tui"]).unwrap();
        assert_eq!(params.timeout, 60);
        assert_eq!(params.refresh_interval, 15);
        assert_eq!(params.log_rotation, RotationPeriod::Daily);
        assert!(params.log_dir.is_none());
        assert!(!params.plain_http);
    }

    #[test]
    fn test_params_logging_options() {
        let params = Params::try_parse_from([
            "irrigation-tui",
            "--log-dir",
            "/tmp/logs",
            "--log-rotation",
            "hourly",
            "--max-log-files",
            "0",
        ])
        .unwrap();
        assert_eq!(params.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(params.log_rotation, RotationPeriod::Hourly);
        assert_eq!(params.max_log_files, 0);
        assert!(Params::try_parse_from(["irrigation-tui", "--refresh-interval", "0"]).is_err());
    }
}
