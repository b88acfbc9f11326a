//! # routines-adapter-virtual
//!
//! A simulated desktop implementing the
//! [`Capabilities`](routines_app::ports::Capabilities) port entirely in
//! memory. It is what `routinesd` runs against, and what end-to-end tests
//! drive with the `simulate_*` helpers.
//!
//! ## Behaviour
//!
//! | Facility | Notes |
//! |----------|-------|
//! | Switches | Setting a switch notifies its watchers. Turning wifi off drops the connection. |
//! | Wifi | Only networks in [`DesktopSnapshot::known_networks`] can be joined. |
//! | Bluetooth | Only paired devices can be connected, and only while bluetooth is on. |
//! | Apps, links, commands, notifications | Logged. Nothing is spawned. |
//!
//! ## Dependency rule
//!
//! Depends on `routines-app` (port traits) and `routines-domain` only.

mod listeners;
mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use routines_app::ports::{Capabilities, Listener, Subscription};
use routines_domain::desktop::{
    BatteryState, BluetoothDevice, Change, ClipboardContent, ScreenOrientation, Signal, Slider,
    Switch,
};
use routines_domain::error::CapabilityError;

use listeners::Listeners;
pub use state::DesktopSnapshot;

#[derive(Default)]
struct Inner {
    state: Mutex<DesktopSnapshot>,
    listeners: Arc<Listeners>,
}

/// In-memory desktop. Clones share the same state.
#[derive(Clone, Default)]
pub struct VirtualDesktop {
    inner: Arc<Inner>,
}

impl VirtualDesktop {
    /// Start from a custom snapshot instead of the default desktop.
    #[must_use]
    pub fn with_snapshot(snapshot: DesktopSnapshot) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(snapshot),
                listeners: Arc::default(),
            }),
        }
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DesktopSnapshot {
        self.lock().clone()
    }

    /// Number of attached change listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    // ── Simulation (changes made "by the user" or the hardware) ──

    pub fn simulate_switch(&self, switch: Switch, on: bool) {
        self.apply_switch(switch, on);
    }

    pub fn simulate_battery(&self, battery: BatteryState) {
        self.update(|state| state.battery = battery);
        self.emit(&Change::Battery(battery));
    }

    pub fn simulate_headphones(&self, connected: bool) {
        self.update(|state| state.headphones = connected);
        self.emit(&Change::Headphones(connected));
    }

    pub fn simulate_clipboard(&self, content: ClipboardContent) {
        self.update(|state| state.clipboard = content.clone());
        self.emit(&Change::Clipboard(content));
    }

    /// Replace the list of running applications.
    pub fn simulate_running_apps(&self, apps: &[&str]) {
        let apps: Vec<String> = apps.iter().map(ToString::to_string).collect();
        self.update(|state| state.running_apps.clone_from(&apps));
        self.emit(&Change::RunningApps(apps));
    }

    /// Move the wifi connection, bypassing the known-network check.
    pub fn simulate_ssid(&self, ssid: Option<&str>) {
        let ssid = ssid.map(str::to_string);
        self.update(|state| state.ssid.clone_from(&ssid));
        self.emit(&Change::WifiConnection(ssid));
    }

    fn apply_switch(&self, switch: Switch, on: bool) {
        let dropped_wifi = self.update(|state| {
            state.switches.insert(switch, on);
            if switch == Switch::Wifi && !on {
                state.ssid.take().is_some()
            } else {
                false
            }
        });
        self.emit(&Change::Switch(switch, on));
        if dropped_wifi {
            self.emit(&Change::WifiConnection(None));
        }
    }

    fn set_device_connected(
        &self,
        operation: &'static str,
        device_id: &str,
        connected: bool,
    ) -> Result<(), CapabilityError> {
        let devices = self.update(|state| {
            if !state.switch(Switch::Bluetooth) {
                return Err(failed(operation, "bluetooth is off".to_string()));
            }
            let device = state
                .devices
                .iter_mut()
                .find(|device| device.id == device_id)
                .ok_or_else(|| failed(operation, format!("device {device_id} is not paired")))?;
            device.connected = connected;
            Ok(state.devices.clone())
        })?;
        tracing::info!(device = device_id, connected, "bluetooth device updated");
        self.emit(&Change::BluetoothDevices(devices));
        Ok(())
    }

    fn read<T>(&self, get: impl FnOnce(&DesktopSnapshot) -> T) -> Result<T, CapabilityError> {
        Ok(get(&self.lock()))
    }

    fn update<T>(&self, change: impl FnOnce(&mut DesktopSnapshot) -> T) -> T {
        change(&mut self.lock())
    }

    fn emit(&self, change: &Change) {
        self.inner.listeners.emit(change);
    }

    fn lock(&self) -> MutexGuard<'_, DesktopSnapshot> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn failed(operation: &'static str, reason: String) -> CapabilityError {
    CapabilityError::Failed { operation, reason }
}

impl Capabilities for VirtualDesktop {
    async fn switch(&self, switch: Switch) -> Result<bool, CapabilityError> {
        self.read(|state| state.switch(switch))
    }

    async fn set_switch(&self, switch: Switch, on: bool) -> Result<(), CapabilityError> {
        tracing::info!(%switch, on, "switch set");
        self.apply_switch(switch, on);
        Ok(())
    }

    async fn slider(&self, slider: Slider) -> Result<u8, CapabilityError> {
        self.read(|state| state.slider(slider))
    }

    async fn set_slider(&self, slider: Slider, level: u8) -> Result<(), CapabilityError> {
        let level = level.min(100);
        tracing::info!(%slider, level, "slider set");
        self.update(|state| state.sliders.insert(slider, level));
        Ok(())
    }

    async fn wallpaper(&self) -> Result<String, CapabilityError> {
        self.read(|state| state.wallpaper.clone())
    }

    async fn set_wallpaper(&self, uri: &str) -> Result<(), CapabilityError> {
        tracing::info!(uri, "wallpaper set");
        self.update(|state| state.wallpaper = uri.to_string());
        Ok(())
    }

    async fn screen_orientation(&self) -> Result<ScreenOrientation, CapabilityError> {
        self.read(|state| state.orientation)
    }

    async fn set_screen_orientation(
        &self,
        orientation: ScreenOrientation,
    ) -> Result<(), CapabilityError> {
        tracing::info!(%orientation, "screen orientation set");
        self.update(|state| state.orientation = orientation);
        Ok(())
    }

    async fn refresh_rate(&self) -> Result<f64, CapabilityError> {
        self.read(|state| state.refresh_rate)
    }

    async fn set_refresh_rate(&self, rate: f64) -> Result<(), CapabilityError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(failed("set_refresh_rate", format!("{rate} Hz is not a valid mode")));
        }
        tracing::info!(rate, "refresh rate set");
        self.update(|state| state.refresh_rate = rate);
        Ok(())
    }

    async fn screen_timeout(&self) -> Result<u32, CapabilityError> {
        self.read(|state| state.screen_timeout)
    }

    async fn set_screen_timeout(&self, seconds: u32) -> Result<(), CapabilityError> {
        tracing::info!(seconds, "screen timeout set");
        self.update(|state| state.screen_timeout = seconds);
        Ok(())
    }

    async fn active_ssid(&self) -> Result<Option<String>, CapabilityError> {
        self.read(|state| state.ssid.clone())
    }

    async fn connect_wifi(&self, ssid: &str) -> Result<(), CapabilityError> {
        self.update(|state| {
            if !state.switch(Switch::Wifi) {
                return Err(failed("connect_wifi", "wifi is off".to_string()));
            }
            if !state.known_networks.iter().any(|known| known == ssid) {
                return Err(failed("connect_wifi", format!("network {ssid} is not in range")));
            }
            state.ssid = Some(ssid.to_string());
            Ok(())
        })?;
        tracing::info!(ssid, "wifi connected");
        self.emit(&Change::WifiConnection(Some(ssid.to_string())));
        Ok(())
    }

    async fn disconnect_wifi(&self) -> Result<(), CapabilityError> {
        let previous = self.update(|state| state.ssid.take());
        if let Some(ssid) = previous {
            tracing::info!(%ssid, "wifi disconnected");
            self.emit(&Change::WifiConnection(None));
        }
        Ok(())
    }

    async fn bluetooth_devices(&self) -> Result<Vec<BluetoothDevice>, CapabilityError> {
        self.read(|state| state.devices.clone())
    }

    async fn connect_bluetooth_device(&self, device_id: &str) -> Result<(), CapabilityError> {
        self.set_device_connected("connect_bluetooth_device", device_id, true)
    }

    async fn disconnect_bluetooth_device(&self, device_id: &str) -> Result<(), CapabilityError> {
        self.set_device_connected("disconnect_bluetooth_device", device_id, false)
    }

    async fn battery(&self) -> Result<BatteryState, CapabilityError> {
        self.read(|state| state.battery)
    }

    async fn headphones_connected(&self) -> Result<bool, CapabilityError> {
        self.read(|state| state.headphones)
    }

    async fn clipboard(&self) -> Result<ClipboardContent, CapabilityError> {
        self.read(|state| state.clipboard.clone())
    }

    async fn set_clipboard_text(&self, text: &str) -> Result<(), CapabilityError> {
        tracing::info!(chars = text.chars().count(), "clipboard written");
        let content = ClipboardContent::Text(text.to_string());
        self.update(|state| state.clipboard = content.clone());
        self.emit(&Change::Clipboard(content));
        Ok(())
    }

    async fn clear_clipboard(&self) -> Result<(), CapabilityError> {
        tracing::info!("clipboard cleared");
        self.update(|state| state.clipboard = ClipboardContent::Empty);
        self.emit(&Change::Clipboard(ClipboardContent::Empty));
        Ok(())
    }

    async fn running_apps(&self) -> Result<Vec<String>, CapabilityError> {
        self.read(|state| state.running_apps.clone())
    }

    async fn launch_app(&self, app_id: &str) -> Result<(), CapabilityError> {
        let launched = self.update(|state| {
            if state.running_apps.iter().any(|app| app == app_id) {
                return None;
            }
            state.running_apps.push(app_id.to_string());
            Some(state.running_apps.clone())
        });
        tracing::info!(app = app_id, already_running = launched.is_none(), "app launched");
        if let Some(apps) = launched {
            self.emit(&Change::RunningApps(apps));
        }
        Ok(())
    }

    async fn open_link(&self, url: &str) -> Result<(), CapabilityError> {
        tracing::info!(url, "link opened");
        Ok(())
    }

    async fn take_screenshot(&self) -> Result<(), CapabilityError> {
        tracing::info!("screenshot taken");
        Ok(())
    }

    async fn execute_command(&self, command: &str) -> Result<(), CapabilityError> {
        tracing::info!(command, "command executed (simulated)");
        Ok(())
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), CapabilityError> {
        tracing::info!(title, message, "notification shown");
        Ok(())
    }

    async fn claim_startup_marker(&self) -> Result<bool, CapabilityError> {
        Ok(self.update(|state| !std::mem::replace(&mut state.startup_claimed, true)))
    }

    fn subscribe(&self, signal: Signal, listener: Listener) -> Subscription {
        self.inner.listeners.register(signal, listener)
    }
}
