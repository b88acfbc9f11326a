//! Action: the effect side of a routine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, invalid};
use crate::desktop::ScreenOrientation;
use crate::error::HydrationError;
use crate::id::ActionId;

const KIND: &str = "action";

/// Closed set of action tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ActionType {
    Wallpaper,
    DoNotDisturb,
    Volume,
    Brightness,
    KeyboardBrightness,
    Wifi,
    Bluetooth,
    ConnectWifi,
    ConnectBluetooth,
    DisconnectBluetooth,
    AirplaneMode,
    DarkMode,
    NightLight,
    ScreenTimeout,
    ScreenOrientation,
    RefreshRate,
    PowerSaver,
    OpenLink,
    TakeScreenshot,
    OpenApp,
    Clipboard,
    Notification,
    ExecuteCommand,
}

impl ActionType {
    pub const ALL: [Self; 23] = [
        Self::Wallpaper,
        Self::DoNotDisturb,
        Self::Volume,
        Self::Brightness,
        Self::KeyboardBrightness,
        Self::Wifi,
        Self::Bluetooth,
        Self::ConnectWifi,
        Self::ConnectBluetooth,
        Self::DisconnectBluetooth,
        Self::AirplaneMode,
        Self::DarkMode,
        Self::NightLight,
        Self::ScreenTimeout,
        Self::ScreenOrientation,
        Self::RefreshRate,
        Self::PowerSaver,
        Self::OpenLink,
        Self::TakeScreenshot,
        Self::OpenApp,
        Self::Clipboard,
        Self::Notification,
        Self::ExecuteCommand,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wallpaper => "wallpaper",
            Self::DoNotDisturb => "dnd",
            Self::Volume => "volume",
            Self::Brightness => "brightness",
            Self::KeyboardBrightness => "keyboard_brightness",
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::ConnectWifi => "connect_wifi",
            Self::ConnectBluetooth => "connect_bluetooth",
            Self::DisconnectBluetooth => "disconnect_bluetooth",
            Self::AirplaneMode => "airplane_mode",
            Self::DarkMode => "dark_mode",
            Self::NightLight => "night_light",
            Self::ScreenTimeout => "screen_timeout",
            Self::ScreenOrientation => "screen_orientation",
            Self::RefreshRate => "refresh_rate",
            Self::PowerSaver => "power_saver",
            Self::OpenLink => "open_link",
            Self::TakeScreenshot => "take_screenshot",
            Self::OpenApp => "open_app",
            Self::Clipboard => "clipboard",
            Self::Notification => "notification",
            Self::ExecuteCommand => "execute_command",
        }
    }

    /// Whether deactivation may undo this action.
    ///
    /// One-shot effects (opening things, notifying, running commands,
    /// rewriting the clipboard) have nothing to restore.
    #[must_use]
    pub fn can_revert(self) -> bool {
        !matches!(
            self,
            Self::OpenLink
                | Self::TakeScreenshot
                | Self::OpenApp
                | Self::Clipboard
                | Self::Notification
                | Self::ExecuteCommand
        )
    }

    /// Desktop resources this action takes control of.
    #[must_use]
    pub fn resources(self) -> &'static [Resource] {
        match self {
            Self::Wifi | Self::ConnectWifi => &[Resource::Wifi],
            Self::Bluetooth | Self::ConnectBluetooth | Self::DisconnectBluetooth => {
                &[Resource::Bluetooth]
            }
            Self::Brightness | Self::KeyboardBrightness => &[Resource::DisplayBrightness],
            Self::Volume => &[Resource::Volume],
            Self::Wallpaper => &[Resource::Wallpaper],
            Self::PowerSaver => &[Resource::PowerSaver],
            Self::DarkMode => &[Resource::DarkMode],
            Self::AirplaneMode => &[Resource::AirplaneMode],
            Self::DoNotDisturb => &[Resource::DoNotDisturb],
            Self::NightLight => &[Resource::NightLight],
            Self::ScreenTimeout => &[Resource::ScreenTimeout],
            Self::ScreenOrientation => &[Resource::ScreenOrientation],
            Self::RefreshRate
            | Self::OpenLink
            | Self::TakeScreenshot
            | Self::OpenApp
            | Self::Clipboard
            | Self::Notification
            | Self::ExecuteCommand => &[],
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = HydrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "screenshot" => return Ok(Self::TakeScreenshot),
            "bluetooth_device" => return Ok(Self::ConnectBluetooth),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| HydrationError::UnknownType {
                kind: KIND,
                tag: s.to_string(),
            })
    }
}

impl TryFrom<String> for ActionType {
    type Error = HydrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActionType> for &'static str {
    fn from(kind: ActionType) -> Self {
        kind.as_str()
    }
}

/// A desktop facility that two routines can fight over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Wifi,
    Bluetooth,
    DisplayBrightness,
    Volume,
    Wallpaper,
    PowerSaver,
    DarkMode,
    AirplaneMode,
    DoNotDisturb,
    NightLight,
    ScreenTimeout,
    ScreenOrientation,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::DisplayBrightness => "display brightness",
            Self::Volume => "volume",
            Self::Wallpaper => "wallpaper",
            Self::PowerSaver => "power saver",
            Self::DarkMode => "dark mode",
            Self::AirplaneMode => "airplane mode",
            Self::DoNotDisturb => "do not disturb",
            Self::NightLight => "night light",
            Self::ScreenTimeout => "screen timeout",
            Self::ScreenOrientation => "screen orientation",
        })
    }
}

/// What happens to an action when its routine stops matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivatePolicy {
    #[default]
    Revert,
    Keep,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnDeactivate {
    #[serde(rename = "type")]
    pub policy: DeactivatePolicy,
    /// Replacement config executed instead of reverting, for [`DeactivatePolicy::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// Persisted action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConfig {
    #[serde(default)]
    pub id: ActionId,
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_deactivate: Option<OnDeactivate>,
}

impl ActionConfig {
    #[must_use]
    pub fn new(kind: ActionType, config: Value) -> Self {
        Self {
            id: ActionId::new(),
            kind,
            config,
            on_deactivate: None,
        }
    }

    #[must_use]
    pub fn with_on_deactivate(mut self, policy: DeactivatePolicy, config: Option<Value>) -> Self {
        self.on_deactivate = Some(OnDeactivate { policy, config });
        self
    }
}

// ── Typed parameters ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWifi {
    pub ssid: String,
    /// Give up after this many seconds.
    #[serde(default = "ConnectWifi::default_timeout")]
    pub timeout: u64,
    /// Seconds between connection attempts.
    #[serde(default = "ConnectWifi::default_interval")]
    pub interval: u64,
}

impl ConnectWifi {
    fn default_timeout() -> u64 {
        30
    }

    fn default_interval() -> u64 {
        5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardOperation {
    Clear,
    Replace,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeMode {
    /// Built-in tracking-parameter tables only.
    #[default]
    Predefined,
    /// Built-in tables plus custom domain rules.
    Merge,
    /// Custom domain rules only.
    Custom,
}

/// Strip `params` from URLs starting with `domain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRule {
    pub domain: String,
    #[serde(default)]
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeConfig {
    #[serde(default)]
    pub mode: SanitizeMode,
    #[serde(default)]
    pub domain_rules: Vec<DomainRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardConfig {
    #[serde(default)]
    pub operation: ClipboardOperation,
    /// Regular expression to replace, for [`ClipboardOperation::Replace`].
    pub find: Option<String>,
    pub replace: Option<String>,
    #[serde(default)]
    pub sanitize: bool,
    #[serde(default)]
    pub sanitize_config: SanitizeConfig,
}

/// Typed action parameters, one variant per [`ActionType`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpec {
    Wallpaper { uri: String },
    DoNotDisturb { enabled: bool },
    Volume { level: u8 },
    Brightness { level: u8 },
    KeyboardBrightness { level: u8 },
    WifiPower { enabled: bool },
    BluetoothPower { enabled: bool },
    ConnectWifi(ConnectWifi),
    ConnectBluetooth { device_id: String },
    DisconnectBluetooth { device_id: String },
    AirplaneMode { enabled: bool },
    DarkMode { enabled: bool },
    NightLight { enabled: bool },
    ScreenTimeout { seconds: u32 },
    ScreenOrientation { orientation: ScreenOrientation },
    RefreshRate { rate: f64 },
    PowerSaver { enabled: bool },
    OpenLink { url: String },
    TakeScreenshot,
    OpenApp { app_ids: Vec<String> },
    Clipboard(ClipboardConfig),
    Notification { title: String, message: String },
    ExecuteCommand { command: String },
}

#[derive(Deserialize)]
struct Enabled {
    enabled: bool,
}

#[derive(Deserialize)]
struct Level {
    level: u8,
}

#[derive(Deserialize)]
struct Wallpaper {
    uri: String,
}

#[derive(Deserialize)]
struct Timeout {
    seconds: u32,
}

#[derive(Deserialize)]
struct Orientation {
    orientation: ScreenOrientation,
}

#[derive(Deserialize)]
struct Rate {
    rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Device {
    device_id: String,
}

#[derive(Deserialize)]
struct Link {
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Apps {
    #[serde(default)]
    app_ids: Vec<String>,
}

#[derive(Deserialize)]
struct Notice {
    title: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct Command {
    command: String,
}

impl ActionSpec {
    /// Build the typed spec for an action of `kind` from a config payload.
    ///
    /// Used both for the configured payload and for a custom
    /// on-deactivate payload of the same type.
    ///
    /// # Errors
    ///
    /// Returns a [`HydrationError`] when the payload does not match the
    /// shape expected for `kind`.
    pub fn parse(kind: ActionType, id: &ActionId, config: &Value) -> Result<Self, HydrationError> {
        let id = id.as_str();
        let level = |config: &Value| -> Result<u8, HydrationError> {
            let Level { level } = decode(KIND, id, config)?;
            if level > 100 {
                return Err(invalid(KIND, id, "level", format!("{level} > 100")));
            }
            Ok(level)
        };
        let enabled = |config: &Value| decode::<Enabled>(KIND, id, config).map(|e| e.enabled);

        let spec = match kind {
            ActionType::Wallpaper => {
                let Wallpaper { uri } = decode(KIND, id, config)?;
                Self::Wallpaper { uri }
            }
            ActionType::DoNotDisturb => Self::DoNotDisturb {
                enabled: enabled(config)?,
            },
            ActionType::Volume => Self::Volume {
                level: level(config)?,
            },
            ActionType::Brightness => Self::Brightness {
                level: level(config)?,
            },
            ActionType::KeyboardBrightness => Self::KeyboardBrightness {
                level: level(config)?,
            },
            ActionType::Wifi => Self::WifiPower {
                enabled: enabled(config)?,
            },
            ActionType::Bluetooth => Self::BluetoothPower {
                enabled: enabled(config)?,
            },
            ActionType::ConnectWifi => {
                let connect: ConnectWifi = decode(KIND, id, config)?;
                if connect.interval == 0 {
                    return Err(invalid(KIND, id, "interval", "must be positive"));
                }
                Self::ConnectWifi(connect)
            }
            ActionType::ConnectBluetooth => {
                let Device { device_id } = decode(KIND, id, config)?;
                Self::ConnectBluetooth { device_id }
            }
            ActionType::DisconnectBluetooth => {
                let Device { device_id } = decode(KIND, id, config)?;
                Self::DisconnectBluetooth { device_id }
            }
            ActionType::AirplaneMode => Self::AirplaneMode {
                enabled: enabled(config)?,
            },
            ActionType::DarkMode => Self::DarkMode {
                enabled: enabled(config)?,
            },
            ActionType::NightLight => Self::NightLight {
                enabled: enabled(config)?,
            },
            ActionType::ScreenTimeout => {
                let Timeout { seconds } = decode(KIND, id, config)?;
                Self::ScreenTimeout { seconds }
            }
            ActionType::ScreenOrientation => {
                let Orientation { orientation } = decode(KIND, id, config)?;
                Self::ScreenOrientation { orientation }
            }
            ActionType::RefreshRate => {
                let Rate { rate } = decode(KIND, id, config)?;
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(invalid(KIND, id, "rate", format!("{rate} is not a refresh rate")));
                }
                Self::RefreshRate { rate }
            }
            ActionType::PowerSaver => Self::PowerSaver {
                enabled: enabled(config)?,
            },
            ActionType::OpenLink => {
                let Link { url } = decode(KIND, id, config)?;
                Self::OpenLink { url }
            }
            ActionType::TakeScreenshot => Self::TakeScreenshot,
            ActionType::OpenApp => {
                let Apps { app_ids } = decode(KIND, id, config)?;
                Self::OpenApp { app_ids }
            }
            ActionType::Clipboard => Self::Clipboard(decode(KIND, id, config)?),
            ActionType::Notification => {
                let Notice { title, message } = decode(KIND, id, config)?;
                Self::Notification { title, message }
            }
            ActionType::ExecuteCommand => {
                let Command { command } = decode(KIND, id, config)?;
                Self::ExecuteCommand { command }
            }
        };
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(kind: ActionType, config: Value) -> Result<ActionSpec, HydrationError> {
        ActionSpec::parse(kind, &ActionId::new(), &config)
    }

    #[test]
    fn should_accept_legacy_aliases() {
        assert_eq!("screenshot".parse::<ActionType>().unwrap(), ActionType::TakeScreenshot);
        assert_eq!(
            "bluetooth_device".parse::<ActionType>().unwrap(),
            ActionType::ConnectBluetooth
        );
    }

    #[test]
    fn should_reject_unknown_action_tag() {
        let result = "teleport".parse::<ActionType>();
        assert!(matches!(result, Err(HydrationError::UnknownType { kind: "action", .. })));
    }

    #[test]
    fn should_serialize_tags_with_their_wire_names() {
        assert_eq!(serde_json::to_value(ActionType::DoNotDisturb).unwrap(), json!("dnd"));
        assert_eq!(
            serde_json::to_value(ActionType::TakeScreenshot).unwrap(),
            json!("take_screenshot")
        );
    }

    #[test]
    fn should_mark_one_shot_actions_as_non_revertible() {
        let one_shot: Vec<_> = ActionType::ALL
            .into_iter()
            .filter(|kind| !kind.can_revert())
            .collect();
        assert_eq!(
            one_shot,
            vec![
                ActionType::OpenLink,
                ActionType::TakeScreenshot,
                ActionType::OpenApp,
                ActionType::Clipboard,
                ActionType::Notification,
                ActionType::ExecuteCommand,
            ]
        );
    }

    #[test]
    fn should_share_resource_between_radio_actions() {
        assert_eq!(ActionType::Wifi.resources(), ActionType::ConnectWifi.resources());
        assert!(ActionType::OpenLink.resources().is_empty());
    }

    #[test]
    fn should_reject_out_of_range_level() {
        let result = parse(ActionType::Volume, json!({"level": 140}));
        assert!(matches!(result, Err(HydrationError::InvalidValue { field: "level", .. })));
    }

    #[test]
    fn should_apply_connect_wifi_defaults() {
        let spec = parse(ActionType::ConnectWifi, json!({"ssid": "Office"})).unwrap();
        assert_eq!(
            spec,
            ActionSpec::ConnectWifi(ConnectWifi {
                ssid: "Office".to_string(),
                timeout: 30,
                interval: 5,
            })
        );
    }

    #[test]
    fn should_parse_clipboard_sanitize_config() {
        let spec = parse(
            ActionType::Clipboard,
            json!({
                "operation": "none",
                "sanitize": true,
                "sanitizeConfig": {"mode": "merge", "domainRules": [{"domain": "https://shop.example", "params": ["ref"]}]}
            }),
        )
        .unwrap();
        let ActionSpec::Clipboard(config) = spec else {
            panic!("expected clipboard spec");
        };
        assert!(config.sanitize);
        assert_eq!(config.sanitize_config.mode, SanitizeMode::Merge);
        assert_eq!(config.sanitize_config.domain_rules[0].params, vec!["ref"]);
    }

    #[test]
    fn should_report_config_error_with_action_id() {
        let id: ActionId = "a7".parse().unwrap();
        let err = ActionSpec::parse(ActionType::DarkMode, &id, &json!({"enabled": "yes"})).unwrap_err();
        assert!(matches!(err, HydrationError::Config { kind: "action", ref id, .. } if id == "a7"));
    }

    #[test]
    fn should_parse_on_deactivate_custom_payload() {
        let config: ActionConfig = serde_json::from_value(json!({
            "id": "a1",
            "type": "brightness",
            "config": {"level": 80},
            "onDeactivate": {"type": "custom", "config": {"level": 30}}
        }))
        .unwrap();
        let on_deactivate = config.on_deactivate.unwrap();
        assert_eq!(on_deactivate.policy, DeactivatePolicy::Custom);
        assert_eq!(on_deactivate.config, Some(json!({"level": 30})));
    }
}
