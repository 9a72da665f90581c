use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::controller::SwitchController;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Keeps the board fresh: once at start, on every tick and whenever the app
/// comes back to the foreground.
pub struct StatusPoller;

impl StatusPoller {
    /// `period` must be non-zero.
    pub fn spawn(controller: SwitchController, period: Duration) -> PollerHandle {
        let foreground = Arc::new(Notify::new());
        let (shutdown, mut stopped) = oneshot::channel::<()>();
        let wake = foreground.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Status poller started, refreshing every {period:?}");
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        debug!("Periodic status refresh");
                        controller.refresh_all_statuses();
                    }
                    _ = wake.notified() => {
                        debug!("Foreground status refresh");
                        controller.refresh_all_statuses();
                    }
                }
            }
            info!("Status poller stopped");
        });

        PollerHandle {
            foreground,
            shutdown: Some(shutdown),
            task,
        }
    }
}

pub struct PollerHandle {
    foreground: Arc<Notify>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Requests an immediate refresh, as when the app becomes active again.
    pub fn foreground(&self) {
        self.foreground.notify_one();
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.task.await;
    }
}
