//! `IngestServer`: Axum HTTP gateway in front of the relay.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::handlers::{IngestState, bot_status};
use crate::notifier::{RelayNotifier, StatusNotifier};

/// The ingestion gateway.
pub struct IngestServer {
    config: IngestConfig,
    notifier: Arc<dyn StatusNotifier>,
    shutdown: CancellationToken,
}

impl IngestServer {
    /// Create a gateway that forwards through `notifier`.
    pub fn new(config: IngestConfig, notifier: Arc<dyn StatusNotifier>) -> Self {
        Self {
            config,
            notifier,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a gateway that posts to the relay at `config.relay_url`.
    pub fn with_relay(config: IngestConfig) -> Result<Self, IngestError> {
        let notifier = RelayNotifier::new(&config.relay_url, config.notify_timeout())?;
        info!(endpoint = notifier.endpoint(), "relay notifier configured");
        Ok(Self::new(config, Arc::new(notifier)))
    }

    /// Stop on `token` instead of a private token.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Build the Axum router. Unknown paths get the framework's 404.
    pub fn router(&self) -> Router {
        let state = IngestState {
            notifier: self.notifier.clone(),
        };
        Router::new()
            .route("/api/bot-status", post(bot_status))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), IngestError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| IngestError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener.local_addr()?;
        info!(%local, "ingestion gateway listening");

        let app = self.router();
        let token = self.shutdown.clone();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                warn!(error = %e, "ingestion gateway stopped with error");
            }
            info!("ingestion gateway stopped");
        });
        Ok((local, task))
    }

    /// Token that stops [`listen`](Self::listen) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The gateway configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use callrelay_core::StatusUpdate;
    use parking_lot::Mutex;
    use tower::ServiceExt;

    use crate::notifier::NotifyError;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<StatusUpdate>>,
        fail: bool,
    }

    #[async_trait]
    impl StatusNotifier for RecordingNotifier {
        async fn notify(&self, update: &StatusUpdate) -> Result<(), NotifyError> {
            self.seen.lock().push(update.clone());
            if self.fail {
                Err(NotifyError::Status(reqwest::StatusCode::BAD_GATEWAY))
            } else {
                Ok(())
            }
        }
    }

    fn make_server(fail: bool) -> (IngestServer, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier {
            fail,
            ..RecordingNotifier::default()
        });
        let server = IngestServer::new(IngestConfig::default(), notifier.clone());
        (server, notifier)
    }

    async fn post(server: &IngestServer, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/bot-status")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn accepted_report_is_forwarded() {
        let (server, notifier) = make_server(false);
        let (status, body) = post(&server, r#"{"callId":"call-1","status":1}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["receivedStatus"], 1);
        assert_eq!(body["message"], "Уже звоню");

        let seen = notifier.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].call_id, "call-1");
    }

    #[tokio::test]
    async fn notifier_failure_does_not_change_response() {
        let (server, notifier) = make_server(true);
        let (status, body) = post(&server, r#"{"callId":"call-2","status":5}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Ошибка");
        assert_eq!(notifier.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn invalid_status_not_forwarded() {
        let (server, notifier) = make_server(false);
        let (status, body) = post(&server, r#"{"callId":"call-1","status":7}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid status provided");
        assert!(notifier.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_call_id_not_forwarded() {
        let (server, notifier) = make_server(false);
        let (status, body) = post(&server, r#"{"status":2}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "callId is required");
        assert!(notifier.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn invalid_json_is_internal_error() {
        let (server, _notifier) = make_server(false);
        let (status, body) = post(&server, "{not json").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let (server, _notifier) = make_server(false);
        let req = Request::builder()
            .uri("/update-status")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn with_shutdown_shares_token() {
        let (server, _notifier) = make_server(false);
        let token = CancellationToken::new();
        let server = server.with_shutdown(token.clone());
        token.cancel();
        assert!(server.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn listen_stops_on_cancel() {
        let (server, _notifier) = make_server(false);
        let (addr, task) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);

        server.shutdown_token().cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
