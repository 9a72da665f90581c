use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use irrigation_client_rs::{ConnectionStatus, DeviceSwitch, StatusPoller, StatusUpdate};
use tokio::signal;
use tracing::info;

use crate::Params;
use crate::utils::{create_controller, format_switch, load_settings};

struct Printer;

#[async_trait]
impl StatusUpdate for Printer {
    async fn status_update(&self, switch: &DeviceSwitch) {
        println!("{}", format_switch(switch));
    }

    async fn connection_update(&self, status: ConnectionStatus) {
        info!("Connection status: {status}");
    }
}

pub async fn watch(params: Params, interval: u64) -> anyhow::Result<()> {
    let settings = load_settings(&params)?;
    let controller = create_controller(&params, &settings)?;
    controller.board().subscribe(Arc::new(Printer));

    let poller = StatusPoller::spawn(controller.clone(), Duration::from_secs(interval));
    println!("Watching {} switches, press Ctrl-C to stop", controller.board().len());

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = signal::ctrl_c() => res?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c().await?;

    info!("signal received, stopping");
    poller.stop().await;
    println!("Status: {}", controller.board().connection_status());
    Ok(())
}
