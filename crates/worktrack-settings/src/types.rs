//! Settings structs. JSON keys are camelCase; every section has defaults so
//! a partial file is enough.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use worktrack_core::CatalogPreset;

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorktrackSettings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

impl WorktrackSettings {
    /// Reject values that would only fail later at startup.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue("server.host is empty".into()));
        }
        check_millis(
            "server.heartbeatIntervalMs",
            self.server.heartbeat_interval_ms,
            HEARTBEAT_RANGE_MS,
        )?;
        check_millis(
            "server.requestTimeoutMs",
            self.server.request_timeout_ms,
            REQUEST_TIMEOUT_RANGE_MS,
        )?;
        if self.database.name.trim().is_empty() {
            return Err(SettingsError::InvalidValue("database.name is empty".into()));
        }
        if self.database.name.contains(['/', '\\']) {
            return Err(SettingsError::InvalidValue(format!(
                "database.name must not contain a path separator: {}",
                self.database.name
            )));
        }
        Ok(())
    }
}

/// Accepted `server.heartbeatIntervalMs` values.
pub const HEARTBEAT_RANGE_MS: (u64, u64) = (1_000, 3_600_000);
/// Accepted `server.requestTimeoutMs` values.
pub const REQUEST_TIMEOUT_RANGE_MS: (u64, u64) = (100, 600_000);

fn check_millis(key: &str, value: u64, (min, max): (u64, u64)) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::InvalidValue(format!(
            "{key} must be between {min} and {max}, got {value}"
        )))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP port. `0` picks a free port.
    pub port: u16,
    /// WebSocket heartbeat interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8050,
            heartbeat_interval_ms: 30_000,
            request_timeout_ms: 30_000,
        }
    }
}

/// Where the documents live: `<url>/<name>.db`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Directory holding the database. A leading `~` is the home directory.
    pub url: String,
    pub name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "~/.worktrack".to_string(),
            name: "work_tracker".to_string(),
        }
    }
}

impl DatabaseSettings {
    pub fn dir(&self) -> PathBuf {
        expand_home(&self.url)
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir().join(format!("{}.db", self.name))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSettings {
    pub preset: CatalogPreset,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Per-target level overrides, e.g. `{"worktrack_store": "debug"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            modules: BTreeMap::new(),
        }
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// Expand a leading `~` to `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some("") => home_dir(),
        Some(rest) if rest.starts_with('/') => home_dir().join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}
