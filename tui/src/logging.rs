//! The terminal belongs to the UI, so logs go to a rolling file.

use std::path::PathBuf;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_PREFIX: &str = "irrigation-tui";

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPeriod {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(period: RotationPeriod) -> Self {
        match period {
            RotationPeriod::Hourly => Rotation::HOURLY,
            RotationPeriod::Daily => Rotation::DAILY,
            RotationPeriod::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub rotation: RotationPeriod,
    /// Files kept in `log_dir`, the appender prunes the oldest. 0 keeps all.
    pub max_log_files: usize,
}

fn file_appender(config: &LogConfig) -> std::io::Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.log_dir)?;
    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log");
    if config.max_log_files > 0 {
        builder = builder.max_log_files(config.max_log_files);
    }
    builder.build(&config.log_dir).map_err(std::io::Error::other)
}

/// Installs the global subscriber. `RUST_LOG` picks the level, `info` when
/// unset. Keep the guard alive until exit or buffered lines are lost.
pub fn setup_file_logging(config: &LogConfig) -> std::io::Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(config)?);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            Layer::default()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    fn log_files(config: &LogConfig) -> Vec<String> {
        std::fs::read_dir(&config.log_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| name.starts_with(LOG_PREFIX))
            .collect()
    }

    #[test]
    fn test_rotation_period_values() {
        assert_eq!(
            RotationPeriod::from_str("hourly", true).unwrap(),
            RotationPeriod::Hourly
        );
        assert_eq!(
            RotationPeriod::from_str("Never", true).unwrap(),
            RotationPeriod::Never
        );
        assert!(RotationPeriod::from_str("weekly", true).is_err());
        assert_eq!(RotationPeriod::default(), RotationPeriod::Daily);
    }

    #[test]
    fn test_appender_writes_into_log_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = LogConfig {
            log_dir: temp_dir.path().join("logs"),
            rotation: RotationPeriod::Never,
            max_log_files: 0,
        };
        let mut appender = file_appender(&config).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        assert_eq!(log_files(&config), vec!["irrigation-tui.log".to_string()]);
    }

    #[test]
    fn test_old_files_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let config = LogConfig {
            log_dir: temp_dir.path().to_path_buf(),
            rotation: RotationPeriod::Daily,
            max_log_files: 2,
        };
        for day in 1..=5 {
            std::fs::write(
                temp_dir.path().join(format!("{LOG_PREFIX}.2020-01-0{day}.log")),
                "x",
            )
            .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        std::fs::write(temp_dir.path().join("other.log"), "x").unwrap();

        let _appender = file_appender(&config).unwrap();

        let remaining = log_files(&config);
        assert!(!remaining.is_empty() && remaining.len() <= 2, "{remaining:?}");
        assert!(temp_dir.path().join("other.log").exists());
    }
}
