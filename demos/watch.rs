//! Watch for blink(1) devices and flash each one red as it is plugged in.
//!
//! Run with: RUST_LOG=blink1=debug cargo run --example watch

use std::time::Duration;

use blink1::{Blink1Config, Blink1Registry, RegistryEvent, Rgb};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blink1=info".parse()?),
        )
        .init();

    let registry = Blink1Registry::start(Blink1Config::default())?;
    let mut events = registry.subscribe();
    info!("Waiting for devices, Ctrl-C to quit");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(RegistryEvent::DeviceAdded(device)) => {
                    match device.set_color(Rgb::RED).await {
                        Ok(n) => info!("{}: wrote {} bytes", device.id(), n),
                        Err(e) => warn!("{}: {}", device.id(), e),
                    }
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    if let Err(e) = device.off().await {
                        warn!("{}: {}", device.id(), e);
                    }
                }
                Ok(RegistryEvent::DeviceRemoved(device)) => {
                    info!("{} unplugged", device.id());
                    device.close().await?;
                }
                Err(RecvError::Lagged(n)) => warn!("Missed {} registry events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    for device in registry.devices() {
        let _ = device.off().await;
        device.close().await?;
    }
    registry.shutdown().await;
    Ok(())
}
