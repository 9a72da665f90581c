//! Shared switch state.
//!
//! The board is the single store the controller writes into and the screens
//! read from. Every change is pushed to the registered observers.

use std::fmt::{self, Display};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::client::ClientError;
use crate::protocol::report::RelayReport;

/// One physical relay as seen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSwitch {
    pub id: Uuid,
    pub name: String,
    pub is_on: bool,
    /// Last transport error for this switch, if any.
    pub error_message: Option<String>,
}

impl DeviceSwitch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_on: false,
            error_message: None,
        }
    }
}

/// Coarse status shared by all switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::NotConnected => "Not connected",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error => "Error",
        }
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait StatusUpdate: Send + Sync {
    async fn status_update(&self, switch: &DeviceSwitch);

    async fn connection_update(&self, _status: ConnectionStatus) {}
}

#[derive(Debug)]
struct SwitchBoardInner {
    switches: Vec<DeviceSwitch>,
    connection_status: ConnectionStatus,
}

/// Ordered set of switches plus the shared connection status.
///
/// Writes are atomic one by one, but concurrent requests complete in any
/// order: the connection status is whatever the last completion wrote.
#[derive(Clone)]
pub struct SwitchBoard {
    inner: Arc<RwLock<SwitchBoardInner>>,
    observers: Arc<RwLock<Vec<Arc<dyn StatusUpdate>>>>,
}

impl SwitchBoard {
    pub fn new(switches: Vec<DeviceSwitch>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SwitchBoardInner {
                switches,
                connection_status: ConnectionStatus::default(),
            })),
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(DeviceSwitch::new).collect())
    }

    pub fn subscribe(&self, observer: Arc<dyn StatusUpdate>) {
        self.observers.write().push(observer);
    }

    pub fn switches(&self) -> Vec<DeviceSwitch> {
        self.inner.read().switches.clone()
    }

    pub fn switch(&self, id: Uuid) -> Option<DeviceSwitch> {
        self.inner
            .read()
            .switches
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn switch_at(&self, index: usize) -> Option<DeviceSwitch> {
        self.inner.read().switches.get(index).cloned()
    }

    /// Looks a switch up by name, ignoring case and surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> Option<DeviceSwitch> {
        let wanted = name.trim().to_lowercase();
        self.inner
            .read()
            .switches
            .iter()
            .find(|s| s.name.trim().to_lowercase() == wanted)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .switches
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().switches.is_empty()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.read().connection_status
    }

    pub async fn rename(&self, index: usize, name: impl Into<String>) -> bool {
        let name = name.into();
        let updated = {
            let mut inner = self.inner.write();
            match inner.switches.get_mut(index) {
                Some(switch) if switch.name != name => {
                    debug!("Renaming switch {index} from {} to {name}", switch.name);
                    switch.name = name;
                    Some(switch.clone())
                }
                _ => None,
            }
        };
        match updated {
            Some(switch) => {
                self.notify_switch(&switch).await;
                true
            }
            None => false,
        }
    }

    /// Sets the local on/off flag, as a user toggle does before the command is sent.
    pub async fn set_on(&self, id: Uuid, on: bool) -> bool {
        match self.with_switch(id, |switch| {
            switch.is_on = on;
        }) {
            Some((_, switch)) => {
                self.notify_switch(&switch).await;
                true
            }
            None => false,
        }
    }

    /// Applies a controller report to the switch the request was sent for.
    ///
    /// Returns false when the reported relay does not name that switch.
    pub async fn apply_report(&self, id: Uuid, report: &RelayReport) -> bool {
        let updated = {
            let mut inner = self.inner.write();
            let Some(switch) = inner.switches.iter_mut().find(|s| s.id == id) else {
                warn!("Report for unknown switch {id}");
                return false;
            };
            if !report.matches(&switch.name) {
                warn!(
                    "Relay '{}' does not match switch name '{}'",
                    report.relay, switch.name
                );
                return false;
            }
            switch.is_on = report.is_on();
            info!(
                "Updated {} to {} (status: {})",
                switch.name,
                switch.is_on,
                report.normalized_status()
            );
            switch.clone()
        };
        self.notify_switch(&updated).await;
        true
    }

    /// Records a completed exchange with the controller.
    pub async fn record_success(&self, id: Uuid) {
        let cleared = self.with_switch(id, |switch| switch.error_message.take().is_some());
        if let Some((true, switch)) = cleared {
            self.notify_switch(&switch).await;
        }
        self.set_connection_status(ConnectionStatus::Connected).await;
    }

    /// Records a transport failure: per-switch message plus coarse status.
    pub async fn record_failure(&self, id: Uuid, error: &ClientError) {
        let status = if error.is_timeout() {
            ConnectionStatus::NotConnected
        } else {
            ConnectionStatus::Error
        };
        let message = error.to_string();
        if let Some((_, switch)) = self.with_switch(id, |switch| {
            switch.error_message = Some(message);
        }) {
            self.notify_switch(&switch).await;
        }
        self.set_connection_status(status).await;
    }

    async fn set_connection_status(&self, status: ConnectionStatus) {
        self.inner.write().connection_status = status;
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.connection_update(status).await;
        }
    }

    fn with_switch<F, R>(&self, id: Uuid, f: F) -> Option<(R, DeviceSwitch)>
    where
        F: FnOnce(&mut DeviceSwitch) -> R,
    {
        let mut inner = self.inner.write();
        let switch = inner.switches.iter_mut().find(|s| s.id == id)?;
        let result = f(switch);
        Some((result, switch.clone()))
    }

    async fn notify_switch(&self, switch: &DeviceSwitch) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.status_update(switch).await;
        }
    }
}
