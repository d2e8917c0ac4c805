//! Best-effort notification of the relay.

use std::time::Duration;

use async_trait::async_trait;
use callrelay_core::StatusUpdate;
use thiserror::Error;
use tracing::debug;

/// Why a relay notification failed.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The HTTP client could not be built.
    #[error("failed to build relay client: {0}")]
    Client(#[source] reqwest::Error),
    /// Connection, timeout or transport failure.
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The relay answered with a non-success status.
    #[error("relay responded with HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Hands a validated update to the relay.
///
/// Implementations make a single attempt; callers log failures and carry on.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    /// Deliver `update` once.
    async fn notify(&self, update: &StatusUpdate) -> Result<(), NotifyError>;
}

/// Posts updates as JSON to `<relay_url>/update-status`.
#[derive(Clone, Debug)]
pub struct RelayNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl RelayNotifier {
    /// Build a notifier for the relay at `relay_url`.
    pub fn new(relay_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self {
            client,
            endpoint: format!("{}/update-status", relay_url.trim_end_matches('/')),
        })
    }

    /// Full notification URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StatusNotifier for RelayNotifier {
    async fn notify(&self, update: &StatusUpdate) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.endpoint).json(update).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        debug!(call_id = %update.call_id, endpoint = %self.endpoint, "relay notified");
        Ok(())
    }
}
