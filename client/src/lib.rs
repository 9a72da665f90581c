mod controller;
mod poller;
mod protocol;
mod settings;
mod state;

#[cfg(test)]
mod test_helper;

pub use controller::SwitchController;
pub use poller::{DEFAULT_REFRESH_INTERVAL, PollerHandle, StatusPoller};
pub use protocol::client::*;
pub use protocol::report::{RelayReport, ReportError};
pub use settings::{
    Credentials, DEFAULT_SETTINGS_FILE, SWITCH_COUNT, Settings, SettingsError, SettingsStore,
};
pub use state::{ConnectionStatus, DeviceSwitch, StatusUpdate, SwitchBoard};
