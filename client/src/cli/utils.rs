use std::time::Duration;

use irrigation_client_rs::{
    ClientError, DeviceSwitch, SWITCH_COUNT, Scheme, Settings, SettingsStore, SwitchBoard,
    SwitchController,
};

use tracing_subscriber::EnvFilter;

use crate::Params;

/// Used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Stored settings with the command line overrides applied.
pub fn load_settings(params: &Params) -> anyhow::Result<Settings> {
    let mut settings = SettingsStore::new(&params.settings).load()?;
    if let Some(host) = &params.host {
        settings.web_host = host.clone();
    }
    if let Some(user) = &params.user {
        settings.username = user.clone();
    }
    if let Some(password) = &params.password {
        settings.password = password.clone();
    }
    Ok(settings)
}

pub fn create_controller(
    params: &Params,
    settings: &Settings,
) -> Result<SwitchController, ClientError> {
    let scheme = if params.plain_http {
        Scheme::Http
    } else {
        Scheme::Https
    };
    SwitchController::from_settings(settings, scheme, Duration::from_secs(params.timeout))
}

pub fn format_switch(switch: &DeviceSwitch) -> String {
    let mut line = format!(
        "{} {}",
        if switch.is_on { "[on] " } else { "[off]" },
        switch.name
    );
    if let Some(error) = &switch.error_message {
        line.push_str(&format!(" ({error})"));
    }
    line
}

pub fn print_board(board: &SwitchBoard) {
    for switch in board.switches() {
        println!("{}", format_switch(&switch));
    }
    println!("Status: {}", board.connection_status());
}

pub fn parse_switch_name(value: &str) -> Result<(usize, String), String> {
    let (index, name) = value
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=NAME, got '{value}'"))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid switch index '{index}'"))?;
    if !(1..=SWITCH_COUNT).contains(&index) {
        return Err(format!("switch index must be between 1 and {SWITCH_COUNT}"));
    }
    Ok((index - 1, name.to_string()))
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_default_log_filter_shows_info() {
        assert_eq!(
            EnvFilter::new(DEFAULT_LOG_FILTER).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }

    #[test]
    fn test_parse_switch_name() {
        assert_eq!(
            parse_switch_name("2=Back Lawn"),
            Ok((1, "Back Lawn".to_string()))
        );
        assert!(parse_switch_name("Back Lawn").is_err());
        assert!(parse_switch_name("0=Nope").is_err());
        assert!(parse_switch_name("5=Nope").is_err());
        assert!(parse_switch_name("x=Nope").is_err());
    }

    #[test]
    fn test_format_switch() {
        let mut switch = DeviceSwitch::new("Roses");
        assert_eq!(format_switch(&switch), "[off] Roses");
        switch.is_on = true;
        switch.error_message = Some("Request failed".to_string());
        assert_eq!(format_switch(&switch), "[on]  Roses (Request failed)");
    }
}
