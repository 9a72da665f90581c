use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::protocol::client::{Action, ClientError, RelayClient, RelayOptions, Scheme};
use crate::settings::Settings;
use crate::state::SwitchBoard;

/// Drives the relay controller and keeps the switch board up to date.
///
/// Every action is one independent request. Nothing is retried, cancelled or
/// deduplicated, so a toggle may race with a refresh that is still in flight.
#[derive(Clone)]
pub struct SwitchController {
    client: RelayClient,
    board: SwitchBoard,
}

impl SwitchController {
    pub fn new(client: RelayClient, board: SwitchBoard) -> Self {
        Self { client, board }
    }

    /// Builds a controller with one switch per configured name.
    pub fn from_settings(
        settings: &Settings,
        scheme: Scheme,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let options = RelayOptions::builder()
            .credentials(settings.credentials())
            .scheme(scheme)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        let client = RelayClient::new(options)?;
        Ok(Self::new(client, SwitchBoard::from_names(settings.names())))
    }

    pub fn board(&self) -> &SwitchBoard {
        &self.board
    }

    pub fn client(&self) -> &RelayClient {
        &self.client
    }

    /// Sends one action and applies its outcome to the board.
    pub async fn execute(&self, id: Uuid, action: Action) {
        let Some(switch) = self.board.switch(id) else {
            warn!("Ignoring {action} for unknown switch {id}");
            return;
        };
        match self.client.request(&switch.name, action).await {
            Ok(report) => {
                self.board.apply_report(id, &report).await;
                self.board.record_success(id).await;
            }
            // the controller answered, just not with a report
            Err(ClientError::Report(e)) => {
                error!("Unexpected response for {}: {e}", switch.name);
                self.board.record_success(id).await;
            }
            Err(ClientError::InvalidUrl(e)) => {
                warn!("Not sending {action} for {}: {e}", switch.name);
            }
            Err(e) => {
                error!("Error sending {action} for {}: {e}", switch.name);
                self.board.record_failure(id, &e).await;
            }
        }
    }

    pub fn send_command(&self, id: Uuid, action: Action) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move { controller.execute(id, action).await })
    }

    /// Flips the local state right away, then asks the controller to follow.
    pub async fn toggle(&self, id: Uuid, on: bool) -> JoinHandle<()> {
        self.board.set_on(id, on).await;
        self.send_command(id, Action::from(on))
    }

    pub fn fetch_status(&self, id: Uuid) -> JoinHandle<()> {
        self.send_command(id, Action::Status)
    }

    /// Fires one status request per switch without waiting for any of them.
    pub fn refresh_all_statuses(&self) -> Vec<JoinHandle<()>> {
        debug!("Refreshing {} switches", self.board.len());
        self.board
            .switches()
            .into_iter()
            .map(|switch| self.fetch_status(switch.id))
            .collect()
    }

    pub async fn rename_switch(&self, index: usize, name: impl Into<String>) -> bool {
        self.board.rename(index, name).await
    }

    /// Uses new credentials and switch names for every following request.
    pub async fn apply_settings(&self, settings: &Settings) {
        self.client.set_credentials(settings.credentials());
        for (index, name) in settings.names().into_iter().enumerate() {
            self.board.rename(index, name).await;
        }
    }
}
