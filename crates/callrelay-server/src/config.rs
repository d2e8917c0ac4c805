//! Relay server configuration.

use std::time::Duration;

use callrelay_settings::RelaySettings;
use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Largest notification body accepted, in bytes.
    pub max_body_bytes: usize,
    /// Per-subscriber outbound queue length.
    pub send_queue_capacity: usize,
    /// Maximum simultaneous subscribers (`0` = unlimited).
    pub max_subscribers: usize,
    /// Ping interval in seconds.
    pub ping_interval_secs: u64,
    /// Silence (no frames, no pongs) after which a subscriber is dropped.
    pub pong_timeout_secs: u64,
    /// `message` field of the notification acknowledgment.
    pub ack_message: String,
    /// Body of the liveness response.
    pub liveness_message: String,
}

impl ServerConfig {
    /// Ping interval as a [`Duration`].
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Pong timeout as a [`Duration`].
    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    /// `host:port` bind string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&RelaySettings {
            host: "127.0.0.1".into(),
            port: 0,
            ..RelaySettings::default()
        })
    }
}

impl From<&RelaySettings> for ServerConfig {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_body_bytes: settings.max_body_bytes,
            send_queue_capacity: settings.send_queue_capacity,
            max_subscribers: settings.max_subscribers,
            ping_interval_secs: settings.ping_interval_secs,
            pong_timeout_secs: settings.pong_timeout_secs,
            ack_message: settings.ack_message.clone(),
            liveness_message: settings.liveness_message.clone(),
        }
    }
}
