//! Layered settings loading.
//!
//! `defaults → settings file → CALLRELAY_* environment`, each layer
//! overriding the previous one. The file is merged as JSON before
//! deserializing: nested objects merge per key, any other value (arrays
//! included) replaces what was there, and `null` leaves the lower layer
//! untouched.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use callrelay_core::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::CallrelaySettings;

/// Resolve the path to the settings file (`~/.callrelay/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".callrelay").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CallrelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<CallrelaySettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the settings file, without env overrides.
fn load_file_layer(path: &Path) -> Result<CallrelaySettings> {
    let defaults = serde_json::to_value(CallrelaySettings::default())?;

    let mut merged = defaults;
    if path.exists() {
        debug!(?path, "loading settings file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        merge_layer(&mut merged, user);
    } else {
        debug!(?path, "no settings file, using defaults");
    }

    Ok(serde_json::from_value(merged)?)
}

/// Overlay `layer` onto `base` in place.
pub fn merge_layer(base: &mut Value, layer: Value) {
    let Value::Object(overrides) = layer else {
        if !layer.is_null() {
            *base = layer;
        }
        return;
    };
    let Value::Object(fields) = base else {
        *base = Value::Object(overrides);
        return;
    };
    for (key, value) in overrides {
        match fields.get_mut(&key) {
            Some(existing) => merge_layer(existing, value),
            None if !value.is_null() => {
                let _ = fields.insert(key, value);
            }
            None => {}
        }
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut CallrelaySettings) {
    apply_overrides_with(settings, &|name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Blank values count as unset. Numbers outside their accepted range are
/// ignored with a warning, keeping the file or default value.
pub fn apply_overrides_with(settings: &mut CallrelaySettings, lookup: &dyn Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    // ── Relay ───────────────────────────────────────────────────────
    if let Some(v) = env.string("CALLRELAY_HOST") {
        settings.relay.host = v;
    }
    if let Some(v) = env.number("CALLRELAY_PORT", 1..=65535) {
        settings.relay.port = v;
    }
    if let Some(v) = env.number("CALLRELAY_MAX_BODY_BYTES", 1..=64 * 1024 * 1024) {
        settings.relay.max_body_bytes = v;
    }
    if let Some(v) = env.number("CALLRELAY_SEND_QUEUE", 1..=1_000_000) {
        settings.relay.send_queue_capacity = v;
    }
    if let Some(v) = env.number("CALLRELAY_MAX_SUBSCRIBERS", 0..=1_000_000) {
        settings.relay.max_subscribers = v;
    }
    if let Some(v) = env.number("CALLRELAY_PING_INTERVAL_SECS", 1..=3_600) {
        settings.relay.ping_interval_secs = v;
    }
    if let Some(v) = env.number("CALLRELAY_PONG_TIMEOUT_SECS", 2..=7_200) {
        settings.relay.pong_timeout_secs = v;
    }
    if let Some(v) = env.number("CALLRELAY_METRICS_PORT", 1..=65535) {
        settings.relay.metrics_port = Some(v);
    }

    // ── Ingest ──────────────────────────────────────────────────────
    if let Some(v) = env.string("CALLRELAY_INGEST_HOST") {
        settings.ingest.host = v;
    }
    if let Some(v) = env.number("CALLRELAY_INGEST_PORT", 1..=65535) {
        settings.ingest.port = v;
    }
    if let Some(v) = env.string("CALLRELAY_RELAY_URL") {
        settings.ingest.relay_url = v;
    }
    if let Some(v) = env.number("CALLRELAY_NOTIFY_TIMEOUT_MS", 100..=600_000) {
        settings.ingest.notify_timeout_ms = v;
    }
    if let Some(v) = env.number("CALLRELAY_INGEST_METRICS_PORT", 1..=65535) {
        settings.ingest.metrics_port = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("CALLRELAY_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("CALLRELAY_LOG_FORMAT") {
        match LogFormat::parse(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "CALLRELAY_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

/// Parse `val` and accept it only inside `range`.
pub fn parse_in_range<T>(val: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    val.trim().parse().ok().filter(|n| range.contains(n))
}

struct EnvReader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    /// Non-empty value of `name`.
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    /// Value of `name` parsed within `range`; anything else is logged and dropped.
    fn number<T>(&self, name: &str, range: RangeInclusive<T>) -> Option<T>
    where
        T: FromStr + PartialOrd + Display + Clone,
    {
        let raw = self.string(name)?;
        let parsed = parse_in_range(&raw, range.clone());
        if parsed.is_none() {
            tracing::warn!(
                key = name,
                value = %raw,
                min = %range.start(),
                max = %range.end(),
                "ignoring out-of-range or non-numeric env override"
            );
        }
        parsed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
