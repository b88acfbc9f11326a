//! Trigger: the condition side of a routine.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, invalid};
use crate::desktop::{BatteryState, BluetoothDevice, ClipboardContent};
use crate::error::HydrationError;
use crate::id::TriggerId;
use crate::time::{minute_of, parse_hh_mm};

const KIND: &str = "trigger";

/// Closed set of trigger tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum TriggerType {
    Time,
    App,
    Wifi,
    Bluetooth,
    Battery,
    PowerSaver,
    DarkMode,
    AirplaneMode,
    Headphones,
    Clipboard,
    Startup,
}

impl TriggerType {
    pub const ALL: [Self; 11] = [
        Self::Time,
        Self::App,
        Self::Wifi,
        Self::Bluetooth,
        Self::Battery,
        Self::PowerSaver,
        Self::DarkMode,
        Self::AirplaneMode,
        Self::Headphones,
        Self::Clipboard,
        Self::Startup,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::App => "app",
            Self::Wifi => "wifi",
            Self::Bluetooth => "bluetooth",
            Self::Battery => "battery",
            Self::PowerSaver => "power_saver",
            Self::DarkMode => "dark_mode",
            Self::AirplaneMode => "airplane_mode",
            Self::Headphones => "headphones",
            Self::Clipboard => "clipboard",
            Self::Startup => "startup",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = HydrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| HydrationError::UnknownType {
                kind: KIND,
                tag: s.to_string(),
            })
    }
}

impl TryFrom<String> for TriggerType {
    type Error = HydrationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerType> for &'static str {
    fn from(kind: TriggerType) -> Self {
        kind.as_str()
    }
}

/// How a trigger's `check()` relates to the change notifications it observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerStrategy {
    /// `check()` reads the current state every time.
    #[serde(rename = "state_persistent")]
    Level,
    /// `check()` stays false until a change is observed after activation.
    #[serde(rename = "initial_ignore")]
    InitialIgnore,
    /// Each qualifying change is reported by exactly one `check()`.
    #[serde(rename = "event_change")]
    EventLatched,
}

/// Persisted trigger definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub id: TriggerId,
    #[serde(rename = "type")]
    pub kind: TriggerType,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<TriggerStrategy>,
}

impl TriggerConfig {
    /// A trigger with a fresh id and the default strategy for its type.
    #[must_use]
    pub fn new(kind: TriggerType, config: Value) -> Self {
        Self {
            id: TriggerId::new(),
            kind,
            config,
            strategy: None,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: TriggerStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Typed trigger parameters, one variant per [`TriggerType`] family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    Time(TimeWindow),
    App(AppCondition),
    Wifi(WifiCondition),
    Bluetooth(BluetoothCondition),
    Battery(BatteryCondition),
    SystemFlag { flag: SystemFlag, expected: bool },
    Clipboard(ClipboardFilter),
    Startup,
}

impl TriggerSpec {
    /// Build the typed spec for a configured trigger.
    ///
    /// # Errors
    ///
    /// Returns a [`HydrationError`] when the config payload does not match
    /// the shape expected for the trigger's type.
    pub fn parse(trigger: &TriggerConfig) -> Result<Self, HydrationError> {
        let id = trigger.id.as_str();
        let config = &trigger.config;
        let spec = match trigger.kind {
            TriggerType::Time => Self::Time(TimeWindow::parse(id, decode(KIND, id, config)?)?),
            TriggerType::App => Self::App(decode(KIND, id, config)?),
            TriggerType::Wifi => Self::Wifi(decode(KIND, id, config)?),
            TriggerType::Bluetooth => Self::Bluetooth(decode(KIND, id, config)?),
            TriggerType::Battery => {
                Self::Battery(BatteryCondition::parse(id, decode(KIND, id, config)?)?)
            }
            TriggerType::PowerSaver => SystemFlag::PowerSaver.parse(id, config)?,
            TriggerType::DarkMode => SystemFlag::DarkMode.parse(id, config)?,
            TriggerType::AirplaneMode => SystemFlag::AirplaneMode.parse(id, config)?,
            TriggerType::Headphones => SystemFlag::Headphones.parse(id, config)?,
            TriggerType::Clipboard => {
                let filter: ClipboardFilter = decode(KIND, id, config)?;
                if filter.content_type == ClipboardContentType::Regex && filter.pattern.is_none() {
                    return Err(invalid(KIND, id, "regex", "missing pattern"));
                }
                Self::Clipboard(filter)
            }
            TriggerType::Startup => Self::Startup,
        };
        Ok(spec)
    }

    /// Strategy used when the configuration does not name one.
    #[must_use]
    pub fn default_strategy(&self) -> TriggerStrategy {
        match self {
            Self::Clipboard(_) => TriggerStrategy::EventLatched,
            Self::Bluetooth(condition)
                if matches!(
                    condition.state,
                    ConnectionState::Connected | ConnectionState::Disconnected
                ) =>
            {
                TriggerStrategy::InitialIgnore
            }
            _ => TriggerStrategy::Level,
        }
    }
}

// ── Time ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeWindowConfig {
    time: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(default)]
    days: Vec<u32>,
}

/// When within a day a time trigger holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// During one exact minute.
    At(NaiveTime),
    /// From `start` (inclusive) to `end` (exclusive), wrapping past midnight
    /// when `start > end`.
    Between { start: NaiveTime, end: NaiveTime },
}

/// A daily time window restricted to some weekdays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub schedule: Schedule,
    /// Weekdays numbered from Sunday (`0`) to Saturday (`6`); empty means every day.
    pub days: Vec<u32>,
}

impl TimeWindow {
    fn parse(id: &str, raw: TimeWindowConfig) -> Result<Self, HydrationError> {
        let time = |field: &'static str, value: &str| {
            parse_hh_mm(value).map_err(|err| invalid(KIND, id, field, err))
        };
        let schedule = match (raw.start_time, raw.end_time, raw.time) {
            (Some(start), Some(end), _) => Schedule::Between {
                start: time("startTime", &start)?,
                end: time("endTime", &end)?,
            },
            (_, _, Some(at)) => Schedule::At(time("time", &at)?),
            _ => return Err(invalid(KIND, id, "startTime", "missing time or window")),
        };
        if let Some(day) = raw.days.iter().find(|day| **day > 6) {
            return Err(invalid(KIND, id, "days", format!("{day} is not a weekday")));
        }
        Ok(Self {
            schedule,
            days: raw.days,
        })
    }

    /// Whether the window holds at the given local wall-clock time.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let weekday = at.weekday().num_days_from_sunday();
        if !self.days.is_empty() && !self.days.contains(&weekday) {
            return false;
        }
        let now = minute_of(at);
        match self.schedule {
            Schedule::At(time) => now == time,
            Schedule::Between { start, end } if start < end => now >= start && now < end,
            Schedule::Between { start, end } if start > end => now >= start || now < end,
            Schedule::Between { .. } => false,
        }
    }
}

// ── App ────────────────────────────────────────────────────────────

/// Holds while any of the listed applications is running.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCondition {
    #[serde(default)]
    pub app_ids: Vec<String>,
}

impl AppCondition {
    #[must_use]
    pub fn matches(&self, running: &[String]) -> bool {
        self.app_ids.iter().any(|app| running.contains(app))
    }
}

// ── Connectivity ───────────────────────────────────────────────────

/// Radio/link state a connectivity trigger waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Enabled,
    Disabled,
}

/// Network link condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WifiCondition {
    pub state: ConnectionState,
    /// Restrict `connected`/`disconnected` to these networks; empty means any.
    #[serde(default)]
    pub ssids: Vec<String>,
}

impl WifiCondition {
    #[must_use]
    pub fn matches(&self, radio_on: bool, ssid: Option<&str>) -> bool {
        let linked = ssid.is_some_and(|ssid| {
            self.ssids.is_empty() || self.ssids.iter().any(|wanted| wanted == ssid)
        });
        match self.state {
            ConnectionState::Enabled => radio_on,
            ConnectionState::Disabled => !radio_on,
            ConnectionState::Connected => linked,
            ConnectionState::Disconnected => !linked,
        }
    }
}

/// Short-range radio condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothCondition {
    pub state: ConnectionState,
    /// Restrict `connected`/`disconnected` to these devices; empty means any.
    #[serde(default)]
    pub device_ids: Vec<String>,
}

impl BluetoothCondition {
    #[must_use]
    pub fn matches(&self, radio_on: bool, devices: &[BluetoothDevice]) -> bool {
        let linked = devices.iter().any(|device| {
            device.connected && (self.device_ids.is_empty() || self.device_ids.contains(&device.id))
        });
        match self.state {
            ConnectionState::Enabled => radio_on,
            ConnectionState::Disabled => !radio_on,
            ConnectionState::Connected => linked,
            ConnectionState::Disconnected => !linked,
        }
    }
}

// ── Battery ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryStatus {
    Charging,
    Discharging,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelComparison {
    #[serde(alias = "equal_or_above")]
    Above,
    #[default]
    Below,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum BatteryMode {
    Status,
    Level,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatteryConfig {
    mode: BatteryMode,
    status: Option<BatteryStatus>,
    level: Option<u8>,
    #[serde(default)]
    level_type: LevelComparison,
}

/// Battery condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryCondition {
    Status(BatteryStatus),
    Level {
        comparison: LevelComparison,
        threshold: u8,
    },
}

impl BatteryCondition {
    fn parse(id: &str, raw: BatteryConfig) -> Result<Self, HydrationError> {
        match raw.mode {
            BatteryMode::Status => raw
                .status
                .map(Self::Status)
                .ok_or_else(|| invalid(KIND, id, "status", "missing status")),
            BatteryMode::Level => match raw.level {
                Some(threshold) if threshold <= 100 => Ok(Self::Level {
                    comparison: raw.level_type,
                    threshold,
                }),
                Some(threshold) => Err(invalid(KIND, id, "level", format!("{threshold} > 100"))),
                None => Err(invalid(KIND, id, "level", "missing level")),
            },
        }
    }

    #[must_use]
    pub fn matches(&self, battery: BatteryState) -> bool {
        match *self {
            Self::Status(BatteryStatus::Charging) => battery.charging,
            Self::Status(BatteryStatus::Discharging) => !battery.charging,
            Self::Status(BatteryStatus::Full) => battery.charging && battery.level >= 100,
            Self::Level {
                comparison: LevelComparison::Above,
                threshold,
            } => battery.level >= threshold,
            Self::Level {
                comparison: LevelComparison::Below,
                threshold,
            } => battery.level < threshold,
        }
    }
}

// ── System flags ───────────────────────────────────────────────────

/// Boolean desktop facilities that can be watched directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemFlag {
    PowerSaver,
    DarkMode,
    AirplaneMode,
    Headphones,
}

impl SystemFlag {
    fn parse(self, id: &str, config: &Value) -> Result<TriggerSpec, HydrationError> {
        let expected = match config.get("state") {
            Some(Value::Bool(state)) => *state,
            Some(Value::String(state)) => match state.as_str() {
                "on" | "true" | "enabled" | "connected" | "plugged" => true,
                "off" | "false" | "disabled" | "disconnected" | "unplugged" => false,
                other => return Err(invalid(KIND, id, "state", format!("unknown state {other:?}"))),
            },
            Some(other) => return Err(invalid(KIND, id, "state", format!("unexpected {other}"))),
            None => return Err(invalid(KIND, id, "state", "missing state")),
        };
        Ok(TriggerSpec::SystemFlag {
            flag: self,
            expected,
        })
    }
}

// ── Clipboard ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipboardContentType {
    #[default]
    Any,
    Text,
    Image,
    Regex,
}

/// Which clipboard changes count as a trigger event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardFilter {
    #[serde(default)]
    pub content_type: ClipboardContentType,
    /// Regular expression applied to text content when `content_type` is `regex`.
    #[serde(default, rename = "regex")]
    pub pattern: Option<String>,
}

impl ClipboardFilter {
    /// Whether the content has the kind this filter waits for.
    ///
    /// Pattern matching for `regex` filters is left to the caller, which
    /// owns the compiled expression.
    #[must_use]
    pub fn accepts_kind(&self, content: &ClipboardContent) -> bool {
        match self.content_type {
            ClipboardContentType::Any => true,
            ClipboardContentType::Text | ClipboardContentType::Regex => content.text().is_some(),
            ClipboardContentType::Image => matches!(content, ClipboardContent::Image),
        }
    }
}
