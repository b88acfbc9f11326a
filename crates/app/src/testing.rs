//! Test doubles for the ports.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use routines_domain::desktop::{
    BatteryState, BluetoothDevice, Change, ClipboardContent, ScreenOrientation, Signal, Slider,
    Switch,
};
use routines_domain::error::{CapabilityError, RoutinesError};
use serde_json::Value;

use crate::ports::{Capabilities, Listener, StateStore, Subscription};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-memory [`StateStore`].
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Value>>,
    saves: AtomicU64,
    read_only: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.documents).get(key).cloned()
    }

    pub fn put(&self, key: &str, value: Value) {
        lock(&self.documents).insert(key.to_string(), value);
    }

    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every later `save` of `key` fail.
    pub fn fail_saves_of(&self, key: &str) {
        lock(&self.read_only).insert(key.to_string());
    }
}

impl StateStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, RoutinesError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), RoutinesError> {
        if lock(&self.read_only).contains(key) {
            return Err(RoutinesError::Storage(
                format!("{key} is read-only").into(),
            ));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.put(key, value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DesktopState {
    pub switches: HashMap<Switch, bool>,
    pub sliders: HashMap<Slider, u8>,
    pub wallpaper: String,
    pub orientation: ScreenOrientation,
    pub refresh_rate: f64,
    pub screen_timeout: u32,
    pub ssid: Option<String>,
    pub devices: Vec<BluetoothDevice>,
    pub battery: BatteryState,
    pub headphones: bool,
    pub clipboard: ClipboardContent,
    pub running_apps: Vec<String>,
    pub startup_claimed: bool,
}

impl Default for DesktopState {
    fn default() -> Self {
        Self {
            switches: HashMap::from([(Switch::Wifi, true), (Switch::Bluetooth, true)]),
            sliders: HashMap::from([
                (Slider::Volume, 50),
                (Slider::Brightness, 50),
                (Slider::KeyboardBrightness, 0),
            ]),
            wallpaper: "file:///default.png".to_string(),
            orientation: ScreenOrientation::Landscape,
            refresh_rate: 60.0,
            screen_timeout: 300,
            ssid: None,
            devices: Vec::new(),
            battery: BatteryState::default(),
            headphones: false,
            clipboard: ClipboardContent::Empty,
            running_apps: Vec::new(),
            startup_claimed: false,
        }
    }
}

#[derive(Default)]
struct FakeInner {
    state: Mutex<DesktopState>,
    listeners: Mutex<Vec<(u64, Signal, Listener)>>,
    next_listener: AtomicU64,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
}

/// Recording [`Capabilities`] fake.
///
/// Every mutating call is logged as a string. Mutations, including the
/// `simulate_*` helpers, notify subscribed listeners.
#[derive(Clone, Default)]
pub struct FakeDesktop {
    inner: Arc<FakeInner>,
}

impl FakeDesktop {
    pub fn state(&self) -> DesktopState {
        lock(&self.inner.state).clone()
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.inner.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.inner.calls).clear();
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    /// Make every call to `operation` fail from now on.
    pub fn fail(&self, operation: &'static str) {
        lock(&self.inner.failing).insert(operation);
    }

    pub fn simulate_ssid(&self, ssid: Option<&str>) {
        lock(&self.inner.state).ssid = ssid.map(str::to_string);
        self.emit(&Change::WifiConnection(ssid.map(str::to_string)));
    }

    pub fn simulate_switch(&self, switch: Switch, on: bool) {
        lock(&self.inner.state).switches.insert(switch, on);
        self.emit(&Change::Switch(switch, on));
    }

    pub fn simulate_battery(&self, battery: BatteryState) {
        lock(&self.inner.state).battery = battery;
        self.emit(&Change::Battery(battery));
    }

    pub fn simulate_devices(&self, devices: Vec<BluetoothDevice>) {
        lock(&self.inner.state).devices.clone_from(&devices);
        self.emit(&Change::BluetoothDevices(devices));
    }

    pub fn simulate_headphones(&self, connected: bool) {
        lock(&self.inner.state).headphones = connected;
        self.emit(&Change::Headphones(connected));
    }

    pub fn simulate_clipboard(&self, content: ClipboardContent) {
        lock(&self.inner.state).clipboard = content.clone();
        self.emit(&Change::Clipboard(content));
    }

    pub fn simulate_running_apps(&self, apps: &[&str]) {
        let apps: Vec<String> = apps.iter().map(ToString::to_string).collect();
        lock(&self.inner.state).running_apps.clone_from(&apps);
        self.emit(&Change::RunningApps(apps));
    }

    pub fn with_state(&self, update: impl FnOnce(&mut DesktopState)) {
        update(&mut lock(&self.inner.state));
    }

    fn emit(&self, change: &Change) {
        let signal = change.signal();
        let targets: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .filter(|(_, watched, _)| *watched == signal)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();
        for listener in targets {
            listener(change);
        }
    }

    fn call(&self, operation: &'static str, detail: String) -> Result<(), CapabilityError> {
        if lock(&self.inner.failing).contains(operation) {
            return Err(CapabilityError::Failed {
                operation,
                reason: "simulated failure".to_string(),
            });
        }
        let entry = if detail.is_empty() {
            operation.to_string()
        } else {
            format!("{operation} {detail}")
        };
        lock(&self.inner.calls).push(entry);
        Ok(())
    }

    fn read<T>(&self, operation: &'static str, get: impl FnOnce(&DesktopState) -> T) -> Result<T, CapabilityError> {
        if lock(&self.inner.failing).contains(operation) {
            return Err(CapabilityError::Unsupported(operation));
        }
        Ok(get(&lock(&self.inner.state)))
    }
}

impl Capabilities for FakeDesktop {
    async fn switch(&self, switch: Switch) -> Result<bool, CapabilityError> {
        self.read("switch", |state| state.switches.get(&switch).copied().unwrap_or(false))
    }

    async fn set_switch(&self, switch: Switch, on: bool) -> Result<(), CapabilityError> {
        self.call("set_switch", format!("{switch}={on}"))?;
        self.simulate_switch(switch, on);
        Ok(())
    }

    async fn slider(&self, slider: Slider) -> Result<u8, CapabilityError> {
        self.read("slider", |state| state.sliders.get(&slider).copied().unwrap_or(0))
    }

    async fn set_slider(&self, slider: Slider, level: u8) -> Result<(), CapabilityError> {
        self.call("set_slider", format!("{slider}={level}"))?;
        lock(&self.inner.state).sliders.insert(slider, level);
        Ok(())
    }

    async fn wallpaper(&self) -> Result<String, CapabilityError> {
        self.read("wallpaper", |state| state.wallpaper.clone())
    }

    async fn set_wallpaper(&self, uri: &str) -> Result<(), CapabilityError> {
        self.call("set_wallpaper", uri.to_string())?;
        lock(&self.inner.state).wallpaper = uri.to_string();
        Ok(())
    }

    async fn screen_orientation(&self) -> Result<ScreenOrientation, CapabilityError> {
        self.read("screen_orientation", |state| state.orientation)
    }

    async fn set_screen_orientation(
        &self,
        orientation: ScreenOrientation,
    ) -> Result<(), CapabilityError> {
        self.call("set_screen_orientation", orientation.to_string())?;
        lock(&self.inner.state).orientation = orientation;
        Ok(())
    }

    async fn refresh_rate(&self) -> Result<f64, CapabilityError> {
        self.read("refresh_rate", |state| state.refresh_rate)
    }

    async fn set_refresh_rate(&self, rate: f64) -> Result<(), CapabilityError> {
        self.call("set_refresh_rate", rate.to_string())?;
        lock(&self.inner.state).refresh_rate = rate;
        Ok(())
    }

    async fn screen_timeout(&self) -> Result<u32, CapabilityError> {
        self.read("screen_timeout", |state| state.screen_timeout)
    }

    async fn set_screen_timeout(&self, seconds: u32) -> Result<(), CapabilityError> {
        self.call("set_screen_timeout", seconds.to_string())?;
        lock(&self.inner.state).screen_timeout = seconds;
        Ok(())
    }

    async fn active_ssid(&self) -> Result<Option<String>, CapabilityError> {
        self.read("active_ssid", |state| state.ssid.clone())
    }

    async fn connect_wifi(&self, ssid: &str) -> Result<(), CapabilityError> {
        self.call("connect_wifi", ssid.to_string())?;
        self.simulate_ssid(Some(ssid));
        Ok(())
    }

    async fn disconnect_wifi(&self) -> Result<(), CapabilityError> {
        self.call("disconnect_wifi", String::new())?;
        self.simulate_ssid(None);
        Ok(())
    }

    async fn bluetooth_devices(&self) -> Result<Vec<BluetoothDevice>, CapabilityError> {
        self.read("bluetooth_devices", |state| state.devices.clone())
    }

    async fn connect_bluetooth_device(&self, device_id: &str) -> Result<(), CapabilityError> {
        self.call("connect_bluetooth_device", device_id.to_string())
    }

    async fn disconnect_bluetooth_device(&self, device_id: &str) -> Result<(), CapabilityError> {
        self.call("disconnect_bluetooth_device", device_id.to_string())
    }

    async fn battery(&self) -> Result<BatteryState, CapabilityError> {
        self.read("battery", |state| state.battery)
    }

    async fn headphones_connected(&self) -> Result<bool, CapabilityError> {
        self.read("headphones_connected", |state| state.headphones)
    }

    async fn clipboard(&self) -> Result<ClipboardContent, CapabilityError> {
        self.read("clipboard", |state| state.clipboard.clone())
    }

    async fn set_clipboard_text(&self, text: &str) -> Result<(), CapabilityError> {
        self.call("set_clipboard_text", text.to_string())?;
        lock(&self.inner.state).clipboard = ClipboardContent::Text(text.to_string());
        Ok(())
    }

    async fn clear_clipboard(&self) -> Result<(), CapabilityError> {
        self.call("clear_clipboard", String::new())?;
        lock(&self.inner.state).clipboard = ClipboardContent::Empty;
        Ok(())
    }

    async fn running_apps(&self) -> Result<Vec<String>, CapabilityError> {
        self.read("running_apps", |state| state.running_apps.clone())
    }

    async fn launch_app(&self, app_id: &str) -> Result<(), CapabilityError> {
        self.call("launch_app", app_id.to_string())
    }

    async fn open_link(&self, url: &str) -> Result<(), CapabilityError> {
        self.call("open_link", url.to_string())
    }

    async fn take_screenshot(&self) -> Result<(), CapabilityError> {
        self.call("take_screenshot", String::new())
    }

    async fn execute_command(&self, command: &str) -> Result<(), CapabilityError> {
        self.call("execute_command", command.to_string())
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), CapabilityError> {
        self.call("notify", format!("{title}: {message}"))
    }

    async fn claim_startup_marker(&self) -> Result<bool, CapabilityError> {
        let mut state = lock(&self.inner.state);
        let claimed = !state.startup_claimed;
        state.startup_claimed = true;
        Ok(claimed)
    }

    fn subscribe(&self, signal: Signal, listener: Listener) -> Subscription {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, signal, listener));
        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner.listeners).retain(|(listener_id, _, _)| *listener_id != id);
            }
        })
    }
}
