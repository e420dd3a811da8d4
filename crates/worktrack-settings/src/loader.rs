//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use worktrack_core::CatalogPreset;

use crate::errors::Result;
use crate::types::{expand_home, WorktrackSettings};

/// `~/.worktrack/settings.json`
pub fn settings_path() -> PathBuf {
    expand_home("~/.worktrack/settings.json")
}

/// An environment override that could not be parsed and was skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgnoredEnvVar {
    pub key: &'static str,
    pub value: String,
}

/// Settings plus the overrides that were skipped while loading them.
///
/// Loading runs before logging is set up, so skipped overrides are handed
/// back for the caller to report.
#[derive(Clone, Debug)]
pub struct LoadedSettings {
    pub settings: WorktrackSettings,
    pub ignored_env: Vec<IgnoredEnvVar>,
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LoadedSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<LoadedSettings> {
    let mut settings = load_file(path)?;
    let ignored_env = apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(LoadedSettings {
        settings,
        ignored_env,
    })
}

fn load_file(path: &Path) -> Result<WorktrackSettings> {
    let defaults = serde_json::to_value(WorktrackSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `WORKTRACK_*` overrides read through `lookup`.
///
/// Invalid values are skipped (the file/default value stays) and returned.
pub fn apply_env_overrides<F>(settings: &mut WorktrackSettings, lookup: F) -> Vec<IgnoredEnvVar>
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let mut ignored = Vec::new();
    let mut skip = |key: &'static str, value: String| ignored.push(IgnoredEnvVar { key, value });

    if let Some(v) = string("WORKTRACK_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = string("WORKTRACK_PORT") {
        match parse_u16_range(&v, 0, 65535) {
            Some(port) => settings.server.port = port,
            None => skip("WORKTRACK_PORT", v),
        }
    }
    if let Some(v) = string("WORKTRACK_DB_URL") {
        settings.database.url = v;
    }
    if let Some(v) = string("WORKTRACK_DB_NAME") {
        settings.database.name = v;
    }
    if let Some(v) = string("WORKTRACK_CATALOG_PRESET") {
        match v.parse::<CatalogPreset>() {
            Ok(preset) => settings.catalog.preset = preset,
            Err(_) => skip("WORKTRACK_CATALOG_PRESET", v),
        }
    }
    if let Some(v) = string("WORKTRACK_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = string("WORKTRACK_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => skip("WORKTRACK_LOG_JSON", v),
        }
    }
    ignored
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8050, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.port, 8050);
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9000}, "database": {"name": "tasks"}, "catalog": {"preset": "extended"}}"#,
        )
        .unwrap();

        let settings = load_file(&path).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.database.name, "tasks");
        assert_eq!(settings.database.url, "~/.worktrack");
        assert_eq!(settings.catalog.preset, CatalogPreset::Extended);
    }

    #[test]
    fn invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert!(matches!(load_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn invalid_value_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"database": {"name": ""}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = WorktrackSettings::default();
        let ignored = apply_env_overrides(
            &mut settings,
            env(&[
                ("WORKTRACK_HOST", "0.0.0.0"),
                ("WORKTRACK_PORT", "9191"),
                ("WORKTRACK_DB_URL", "/data"),
                ("WORKTRACK_DB_NAME", "prod"),
                ("WORKTRACK_CATALOG_PRESET", "extended"),
                ("WORKTRACK_LOG_LEVEL", "debug"),
                ("WORKTRACK_LOG_JSON", "yes"),
            ]),
        );
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9191);
        assert_eq!(settings.database.file_path(), PathBuf::from("/data/prod.db"));
        assert_eq!(settings.catalog.preset, CatalogPreset::Extended);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
        assert!(ignored.is_empty());
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = WorktrackSettings::default();
        let ignored = apply_env_overrides(
            &mut settings,
            env(&[
                ("WORKTRACK_PORT", "99999"),
                ("WORKTRACK_CATALOG_PRESET", "fancy"),
                ("WORKTRACK_LOG_JSON", "maybe"),
                ("WORKTRACK_HOST", ""),
            ]),
        );
        assert_eq!(settings.server.port, 8050);
        assert_eq!(settings.catalog.preset, CatalogPreset::Classic);
        assert!(!settings.logging.json);
        assert_eq!(settings.server.host, "127.0.0.1");
        let keys: Vec<&str> = ignored.iter().map(|i| i.key).collect();
        assert_eq!(keys, ["WORKTRACK_PORT", "WORKTRACK_CATALOG_PRESET", "WORKTRACK_LOG_JSON"]);
        assert_eq!(ignored[0].value, "99999");
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "yes", "ON"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "no", "Off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("0", 0, 65535), Some(0));
        assert_eq!(parse_u16_range("8050", 1, 65535), Some(8050));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("abc", 1, 65535), None);
    }
}
