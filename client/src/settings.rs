use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const SWITCH_COUNT: usize = 4;
pub const DEFAULT_SETTINGS_FILE: &str = "irrigation-settings.json";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Host and login of the relay controller. Stored in clear text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub web_host: String,
    pub username: String,
    pub password: String,
    pub switch_names: Vec<String>,
    pub has_configured: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            web_host: String::new(),
            username: String::new(),
            password: String::new(),
            switch_names: (0..SWITCH_COUNT).map(default_switch_name).collect(),
            has_configured: false,
        }
    }
}

fn default_switch_name(index: usize) -> String {
    format!("Switch {}", index + 1)
}

impl Settings {
    pub fn switch_name(&self, index: usize) -> String {
        self.switch_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| default_switch_name(index))
    }

    /// Names for all switches, falling back to defaults for unset slots.
    pub fn names(&self) -> Vec<String> {
        (0..SWITCH_COUNT).map(|i| self.switch_name(i)).collect()
    }

    pub fn set_switch_name(&mut self, index: usize, name: impl Into<String>) {
        if index >= SWITCH_COUNT {
            return;
        }
        while self.switch_names.len() <= index {
            let next = self.switch_names.len();
            self.switch_names.push(default_switch_name(next));
        }
        self.switch_names[index] = name.into();
    }

    pub fn is_complete(&self) -> bool {
        !self.web_host.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            host: self.web_host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// JSON file holding the settings as flat key-value pairs.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings; a missing file yields the defaults.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                debug!("Loaded settings from {}", self.path.display());
                Ok(serde_json::from_str(&content)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No settings at {}, using defaults",
                    self.path.display()
                );
                Ok(Settings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
