//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may contain any subset of fields; missing fields keep their default.

use callrelay_core::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "relay": { "port": 3001 },
///   "ingest": { "relayUrl": "http://relay.internal:3001" },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallrelaySettings {
    /// Status relay (notification endpoint + subscriber connections).
    pub relay: RelaySettings,
    /// Bot-status ingestion gateway.
    pub ingest: IngestSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl CallrelaySettings {
    /// Reject combinations the servers cannot run with.
    pub fn validate(&self) -> Result<()> {
        let relay = &self.relay;
        if relay.send_queue_capacity == 0 {
            return Err(SettingsError::invalid(
                "relay.sendQueueCapacity",
                "must be at least 1",
            ));
        }
        if relay.max_body_bytes == 0 {
            return Err(SettingsError::invalid(
                "relay.maxBodyBytes",
                "must be at least 1",
            ));
        }
        if relay.ping_interval_secs == 0 {
            return Err(SettingsError::invalid(
                "relay.pingIntervalSecs",
                "must be at least 1",
            ));
        }
        if relay.pong_timeout_secs <= relay.ping_interval_secs {
            return Err(SettingsError::invalid(
                "relay.pongTimeoutSecs",
                format!(
                    "{} must exceed relay.pingIntervalSecs ({})",
                    relay.pong_timeout_secs, relay.ping_interval_secs
                ),
            ));
        }
        if !(self.ingest.relay_url.starts_with("http://")
            || self.ingest.relay_url.starts_with("https://"))
        {
            return Err(SettingsError::invalid(
                "ingest.relayUrl",
                format!("expected an http(s) URL, got {:?}", self.ingest.relay_url),
            ));
        }
        Ok(())
    }
}

/// Status relay network and fan-out settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Bind address.
    pub host: String,
    /// Port shared by `POST /update-status` and WebSocket upgrades.
    pub port: u16,
    /// Largest notification body accepted, in bytes.
    pub max_body_bytes: usize,
    /// Per-subscriber outbound queue length. A full queue counts as a send failure.
    pub send_queue_capacity: usize,
    /// Maximum simultaneous subscribers (`0` = unlimited).
    pub max_subscribers: usize,
    /// Interval between server-initiated Ping frames.
    pub ping_interval_secs: u64,
    /// Disconnect a subscriber that has been silent for this long.
    pub pong_timeout_secs: u64,
    /// Text of the `message` field in the notification acknowledgment.
    pub ack_message: String,
    /// Plain-text body returned by every non-notification request.
    pub liveness_message: String,
    /// Port for the Prometheus exporter (`None` = disabled).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            max_body_bytes: 1024 * 1024,
            send_queue_capacity: 256,
            max_subscribers: 0,
            ping_interval_secs: 30,
            pong_timeout_secs: 60,
            ack_message: "Status updated and broadcast".to_string(),
            liveness_message: "Status relay is running".to_string(),
            metrics_port: None,
        }
    }
}

/// Bot-status ingestion gateway settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestSettings {
    /// Bind address.
    pub host: String,
    /// Listening port.
    pub port: u16,
    /// Base URL of the relay; updates are posted to `<relayUrl>/update-status`.
    pub relay_url: String,
    /// Timeout for the relay notification call, in milliseconds.
    pub notify_timeout_ms: u64,
    /// Port for the Prometheus exporter (disabled when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            relay_url: "http://localhost:3001".to_string(),
            notify_timeout_ms: 5_000,
            metrics_port: None,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive. `RUST_LOG` overrides it.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
