//! `routinesd` settings.
//!
//! Read from `routines.toml` (or the file named by `ROUTINES_CONFIG`), then
//! overridden by `ROUTINES_*` environment variables. A missing file means
//! all defaults.

use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use routines_adapter_storage_sqlite_sqlx::Config as StorageConfig;
use routines_app::engine::EngineSettings;
use routines_app::trigger::TriggerSettings;
use serde::Deserialize;

const DEFAULT_PATH: &str = "routines.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives.
    pub filter: String,
}

/// Circuit breaker limits and trigger timings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_evaluations: u32,
    pub window_seconds: u32,
    pub time_poll_seconds: u64,
    pub clipboard_debounce_ms: u64,
    /// Engine events buffered per SSE subscriber.
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:routines.db?mode=rwc".to_string(),
            max_connections: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "routinesd=info,routines=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 100,
            window_seconds: 60,
            time_poll_seconds: 60,
            clipboard_debounce_ms: 500,
            event_capacity: 256,
        }
    }
}

impl Config {
    /// File, then process environment, then validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an unreadable or malformed file, or a
    /// value out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let env = |name: &str| std::env::var(name).ok();
        let path = env("ROUTINES_CONFIG").unwrap_or_else(|| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// `lookup` resolves a variable name; unparsable numbers are ignored.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some((host, port)) = lookup("ROUTINES_BIND")
            .as_deref()
            .and_then(|bind| bind.rsplit_once(':'))
        {
            self.server.host = host.to_string();
            self.server.port = port.parse().unwrap_or(self.server.port);
        }
        if let Some(host) = lookup("ROUTINES_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("ROUTINES_PORT").and_then(|port| port.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("ROUTINES_DATABASE_URL") {
            self.database.url = url;
        }
        // RUST_LOG wins over ROUTINES_LOG.
        if let Some(filter) = lookup("RUST_LOG").or_else(|| lookup("ROUTINES_LOG")) {
            self.logging.filter = filter;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("server.port", self.server.port == 0),
            ("database.max_connections", self.database.max_connections == 0),
            ("engine.max_evaluations", self.engine.max_evaluations == 0),
            ("engine.window_seconds", self.engine.window_seconds == 0),
            ("engine.time_poll_seconds", self.engine.time_poll_seconds == 0),
            ("engine.event_capacity", self.engine.event_capacity == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(ConfigError::Validation(format!("{field} must be non-zero"))),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn storage(&self) -> StorageConfig {
        StorageConfig {
            max_connections: self.database.max_connections,
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
            ..StorageConfig::new(self.database.url.clone())
        }
    }

    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_evaluations: self.engine.max_evaluations,
            window: TimeDelta::seconds(i64::from(self.engine.window_seconds)),
        }
    }

    #[must_use]
    pub fn trigger_settings(&self) -> TriggerSettings {
        TriggerSettings {
            time_poll: Duration::from_secs(self.engine.time_poll_seconds),
            clipboard_debounce: Duration::from_millis(self.engine.clipboard_debounce_ms),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
