//! Joining networks and pairing devices.

use std::time::Duration;

use routines_domain::desktop::Switch;
use routines_domain::error::{CapabilityError, RoutinesError};
use routines_domain::routine::{ActionSpec, ConnectWifi};
use tokio::time::Instant;

use super::Previous;
use crate::ports::Capabilities;

pub(super) async fn apply<C: Capabilities>(
    spec: &ActionSpec,
    previous: &mut Option<Previous>,
    desktop: &C,
) -> Result<(), RoutinesError> {
    match spec {
        ActionSpec::ConnectWifi(connect) => {
            if desktop.active_ssid().await?.as_deref() == Some(connect.ssid.as_str()) {
                tracing::debug!(ssid = %connect.ssid, "already connected");
                return Ok(());
            }
            join(connect, desktop).await?;
            *previous = Some(Previous::Connected);
        }
        ActionSpec::ConnectBluetooth { device_id } => {
            desktop.connect_bluetooth_device(device_id).await?;
        }
        ActionSpec::DisconnectBluetooth { device_id } => {
            desktop.disconnect_bluetooth_device(device_id).await?;
        }
        _ => {}
    }
    Ok(())
}

pub(super) async fn revert<C: Capabilities>(
    spec: &ActionSpec,
    previous: &mut Option<Previous>,
    desktop: &C,
) -> Result<(), RoutinesError> {
    match spec {
        ActionSpec::ConnectWifi(connect) => {
            if previous.take() != Some(Previous::Connected) {
                return Ok(());
            }
            if desktop.active_ssid().await?.as_deref() == Some(connect.ssid.as_str()) {
                desktop.disconnect_wifi().await?;
            }
        }
        ActionSpec::ConnectBluetooth { device_id } => {
            if desktop.switch(Switch::Bluetooth).await? {
                desktop.disconnect_bluetooth_device(device_id).await?;
            }
        }
        ActionSpec::DisconnectBluetooth { device_id } => {
            if desktop.switch(Switch::Bluetooth).await? {
                desktop.connect_bluetooth_device(device_id).await?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Turn the radio on and retry joining until the SSID shows up.
async fn join<C: Capabilities>(connect: &ConnectWifi, desktop: &C) -> Result<(), RoutinesError> {
    if !desktop.switch(Switch::Wifi).await? {
        desktop.set_switch(Switch::Wifi, true).await?;
    }
    let deadline = Instant::now() + Duration::from_secs(connect.timeout);
    let interval = Duration::from_secs(connect.interval);
    loop {
        desktop.connect_wifi(&connect.ssid).await?;
        if desktop.active_ssid().await?.as_deref() == Some(connect.ssid.as_str()) {
            tracing::info!(ssid = %connect.ssid, "joined network");
            return Ok(());
        }
        if Instant::now() + interval > deadline {
            break;
        }
        tracing::debug!(ssid = %connect.ssid, "network not joined yet, retrying");
        tokio::time::sleep(interval).await;
    }
    Err(CapabilityError::Failed {
        operation: "connect_wifi",
        reason: format!("{} not joined within {}s", connect.ssid, connect.timeout),
    }
    .into())
}
