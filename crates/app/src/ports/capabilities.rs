//! Capability port: everything the engine reads from or does to the desktop.
//!
//! Getters and setters are async. Change notifications are synchronous:
//! a [`Listener`] registered through [`Capabilities::subscribe`] is called
//! with the new value whenever the watched facility changes, from whatever
//! context performed the change. Listeners must therefore be cheap and must
//! not block.

use std::future::Future;
use std::sync::Arc;

use routines_domain::desktop::{
    BatteryState, BluetoothDevice, Change, ClipboardContent, ScreenOrientation, Signal, Slider,
    Switch,
};
use routines_domain::error::CapabilityError;

/// Callback invoked on a change notification.
pub type Listener = Arc<dyn Fn(&Change) + Send + Sync>;

/// Keeps a listener attached. Dropping it, or calling
/// [`cancel`](Self::cancel), detaches the listener.
#[must_use = "dropping a subscription detaches its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Detach the listener now.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}

/// Access to the host desktop.
pub trait Capabilities: Send + Sync + 'static {
    // ── Switches and sliders ──────────────────────────────────────

    fn switch(&self, switch: Switch) -> impl Future<Output = Result<bool, CapabilityError>> + Send;

    fn set_switch(
        &self,
        switch: Switch,
        on: bool,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn slider(&self, slider: Slider) -> impl Future<Output = Result<u8, CapabilityError>> + Send;

    fn set_slider(
        &self,
        slider: Slider,
        level: u8,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    // ── Display ───────────────────────────────────────────────────

    fn wallpaper(&self) -> impl Future<Output = Result<String, CapabilityError>> + Send;

    fn set_wallpaper(&self, uri: &str) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn screen_orientation(
        &self,
    ) -> impl Future<Output = Result<ScreenOrientation, CapabilityError>> + Send;

    fn set_screen_orientation(
        &self,
        orientation: ScreenOrientation,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn refresh_rate(&self) -> impl Future<Output = Result<f64, CapabilityError>> + Send;

    fn set_refresh_rate(&self, rate: f64)
    -> impl Future<Output = Result<(), CapabilityError>> + Send;

    /// Idle delay before the screen blanks, in seconds.
    fn screen_timeout(&self) -> impl Future<Output = Result<u32, CapabilityError>> + Send;

    fn set_screen_timeout(
        &self,
        seconds: u32,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    // ── Radios ────────────────────────────────────────────────────

    /// SSID of the connected network, `None` when not connected.
    fn active_ssid(&self) -> impl Future<Output = Result<Option<String>, CapabilityError>> + Send;

    /// Ask the radio to join `ssid`. Completion is observed through
    /// [`active_ssid`](Self::active_ssid).
    fn connect_wifi(&self, ssid: &str) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn disconnect_wifi(&self) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn bluetooth_devices(
        &self,
    ) -> impl Future<Output = Result<Vec<BluetoothDevice>, CapabilityError>> + Send;

    fn connect_bluetooth_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn disconnect_bluetooth_device(
        &self,
        device_id: &str,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    // ── Sensors ───────────────────────────────────────────────────

    fn battery(&self) -> impl Future<Output = Result<BatteryState, CapabilityError>> + Send;

    fn headphones_connected(&self) -> impl Future<Output = Result<bool, CapabilityError>> + Send;

    // ── Clipboard ─────────────────────────────────────────────────

    fn clipboard(&self) -> impl Future<Output = Result<ClipboardContent, CapabilityError>> + Send;

    fn set_clipboard_text(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn clear_clipboard(&self) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    // ── Applications and one-shot functions ───────────────────────

    /// Identifiers of the applications currently running.
    fn running_apps(&self) -> impl Future<Output = Result<Vec<String>, CapabilityError>> + Send;

    fn launch_app(&self, app_id: &str) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn open_link(&self, url: &str) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn take_screenshot(&self) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn execute_command(
        &self,
        command: &str,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    fn notify(
        &self,
        title: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), CapabilityError>> + Send;

    // ── Session ───────────────────────────────────────────────────

    /// Returns `true` exactly once per desktop session.
    fn claim_startup_marker(&self) -> impl Future<Output = Result<bool, CapabilityError>> + Send;

    /// Watch a facility for changes.
    fn subscribe(&self, signal: Signal, listener: Listener) -> Subscription;
}
