//! Ingestion gateway configuration.

use std::time::Duration;

use callrelay_settings::IngestSettings;
use serde::{Deserialize, Serialize};

/// Configuration for the ingestion gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Relay base URL; updates go to `<relay_url>/update-status`.
    pub relay_url: String,
    /// Timeout for one relay notification, in milliseconds.
    pub notify_timeout_ms: u64,
}

impl IngestConfig {
    /// Notification timeout as a [`Duration`].
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    /// `host:port` bind string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::from(&IngestSettings {
            host: "127.0.0.1".into(),
            port: 0,
            ..IngestSettings::default()
        })
    }
}

impl From<&IngestSettings> for IngestConfig {
    fn from(settings: &IngestSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            relay_url: settings.relay_url.clone(),
            notify_timeout_ms: settings.notify_timeout_ms,
        }
    }
}
