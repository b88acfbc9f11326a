//! Value types describing desktop facilities.
//!
//! These are the payloads exchanged with the capability layer: what a
//! getter returns, what a change notification carries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current clipboard content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ClipboardContent {
    #[default]
    Empty,
    Text(String),
    Image,
}

impl ClipboardContent {
    /// The text payload, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Empty | Self::Image => None,
        }
    }
}

/// Battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryState {
    /// Charge percentage, `0..=100`.
    pub level: u8,
    pub charging: bool,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            level: 100,
            charging: false,
        }
    }
}

/// A paired short-range radio device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BluetoothDevice {
    /// Hardware address or adapter-specific identifier.
    pub id: String,
    pub name: String,
    pub connected: bool,
}

/// Display rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenOrientation {
    Portrait,
    #[default]
    Landscape,
    Normal,
    Right,
    Left,
    UpsideDown,
}

impl ScreenOrientation {
    /// The "other" orientation used when no prior reading is available.
    ///
    /// Only portrait and landscape have an inverse; the rotated variants
    /// map back to landscape.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Landscape | Self::Normal => Self::Portrait,
            Self::Portrait | Self::Right | Self::Left | Self::UpsideDown => Self::Landscape,
        }
    }
}

impl fmt::Display for ScreenOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
            Self::Normal => "normal",
            Self::Right => "right",
            Self::Left => "left",
            Self::UpsideDown => "upside-down",
        })
    }
}

/// On/off desktop facilities that can be both read and set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Switch {
    Wifi,
    Bluetooth,
    DoNotDisturb,
    DarkMode,
    NightLight,
    PowerSaver,
    AirplaneMode,
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::DoNotDisturb => "do not disturb",
            Self::DarkMode => "dark mode",
            Self::NightLight => "night light",
            Self::PowerSaver => "power saver",
            Self::AirplaneMode => "airplane mode",
        })
    }
}

/// Percentage settings, `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slider {
    Volume,
    Brightness,
    KeyboardBrightness,
}

impl fmt::Display for Slider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Volume => "volume",
            Self::Brightness => "brightness",
            Self::KeyboardBrightness => "keyboard brightness",
        })
    }
}

/// A facility whose changes can be watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Switch(Switch),
    WifiConnection,
    BluetoothDevices,
    Battery,
    Headphones,
    Clipboard,
    RunningApps,
}

/// A change notification, carrying the new value.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Switch(Switch, bool),
    /// The SSID of the network now connected to, if any.
    WifiConnection(Option<String>),
    BluetoothDevices(Vec<BluetoothDevice>),
    Battery(BatteryState),
    Headphones(bool),
    Clipboard(ClipboardContent),
    RunningApps(Vec<String>),
}

impl Change {
    #[must_use]
    pub fn signal(&self) -> Signal {
        match self {
            Self::Switch(switch, _) => Signal::Switch(*switch),
            Self::WifiConnection(_) => Signal::WifiConnection,
            Self::BluetoothDevices(_) => Signal::BluetoothDevices,
            Self::Battery(_) => Signal::Battery,
            Self::Headphones(_) => Signal::Headphones,
            Self::Clipboard(_) => Signal::Clipboard,
            Self::RunningApps(_) => Signal::RunningApps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_toggle_between_portrait_and_landscape() {
        assert_eq!(ScreenOrientation::Portrait.toggled(), ScreenOrientation::Landscape);
        assert_eq!(ScreenOrientation::Landscape.toggled(), ScreenOrientation::Portrait);
        assert_eq!(ScreenOrientation::UpsideDown.toggled(), ScreenOrientation::Landscape);
    }

    #[test]
    fn should_expose_text_only_for_text_content() {
        assert_eq!(ClipboardContent::Text("hi".into()).text(), Some("hi"));
        assert_eq!(ClipboardContent::Image.text(), None);
    }

    #[test]
    fn should_map_change_to_its_signal() {
        assert_eq!(
            Change::Switch(Switch::DarkMode, true).signal(),
            Signal::Switch(Switch::DarkMode)
        );
        assert_eq!(Change::RunningApps(vec![]).signal(), Signal::RunningApps);
    }

    #[test]
    fn should_deserialize_kebab_case_orientation() {
        let orientation: ScreenOrientation = serde_json::from_str("\"upside-down\"").unwrap();
        assert_eq!(orientation, ScreenOrientation::UpsideDown);
    }
}
