//! Simulated desktop state.

use std::collections::HashMap;

use routines_domain::desktop::{
    BatteryState, BluetoothDevice, ClipboardContent, ScreenOrientation, Slider, Switch,
};

/// Everything the virtual desktop remembers.
#[derive(Debug, Clone, PartialEq)]
pub struct DesktopSnapshot {
    pub switches: HashMap<Switch, bool>,
    pub sliders: HashMap<Slider, u8>,
    pub wallpaper: String,
    pub orientation: ScreenOrientation,
    pub refresh_rate: f64,
    /// Seconds.
    pub screen_timeout: u32,
    pub ssid: Option<String>,
    /// Networks the radio can join.
    pub known_networks: Vec<String>,
    pub devices: Vec<BluetoothDevice>,
    pub battery: BatteryState,
    pub headphones: bool,
    pub clipboard: ClipboardContent,
    pub running_apps: Vec<String>,
    pub startup_claimed: bool,
}

impl Default for DesktopSnapshot {
    fn default() -> Self {
        Self {
            switches: HashMap::from([
                (Switch::Wifi, true),
                (Switch::Bluetooth, true),
                (Switch::DoNotDisturb, false),
                (Switch::DarkMode, false),
                (Switch::NightLight, false),
                (Switch::PowerSaver, false),
                (Switch::AirplaneMode, false),
            ]),
            sliders: HashMap::from([
                (Slider::Volume, 40),
                (Slider::Brightness, 70),
                (Slider::KeyboardBrightness, 0),
            ]),
            wallpaper: "file:///usr/share/backgrounds/default.png".to_string(),
            orientation: ScreenOrientation::Landscape,
            refresh_rate: 60.0,
            screen_timeout: 300,
            ssid: Some("Home".to_string()),
            known_networks: vec!["Home".to_string(), "Office".to_string()],
            devices: vec![
                BluetoothDevice {
                    id: "00:1A:7D:DA:71:01".to_string(),
                    name: "Headphones".to_string(),
                    connected: false,
                },
                BluetoothDevice {
                    id: "00:1A:7D:DA:71:02".to_string(),
                    name: "Keyboard".to_string(),
                    connected: true,
                },
            ],
            battery: BatteryState {
                level: 80,
                charging: true,
            },
            headphones: false,
            clipboard: ClipboardContent::Empty,
            running_apps: Vec::new(),
            startup_claimed: false,
        }
    }
}

impl DesktopSnapshot {
    pub(crate) fn switch(&self, switch: Switch) -> bool {
        self.switches.get(&switch).copied().unwrap_or(false)
    }

    pub(crate) fn slider(&self, slider: Slider) -> u8 {
        self.sliders.get(&slider).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_connected_to_home_network() {
        let snapshot = DesktopSnapshot::default();
        assert_eq!(snapshot.ssid.as_deref(), Some("Home"));
        assert!(snapshot.switch(Switch::Wifi));
        assert!(!snapshot.switch(Switch::DarkMode));
    }

    #[test]
    fn should_read_missing_slider_as_zero() {
        let mut snapshot = DesktopSnapshot::default();
        snapshot.sliders.clear();
        assert_eq!(snapshot.slider(Slider::Volume), 0);
    }
}
