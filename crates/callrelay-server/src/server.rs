//! `RelayServer`: Axum HTTP + `WebSocket` status relay.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handlers::{AppState, accept, update_status};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::Broadcaster;

/// The status relay.
pub struct RelayServer {
    config: Arc<ServerConfig>,
    broadcaster: Arc<Broadcaster>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl RelayServer {
    /// Create a relay with an empty subscriber registry.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            broadcaster: Arc::new(Broadcaster::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
        }
    }

    /// Build the Axum router.
    ///
    /// `POST /update-status` relays; every other method on that path and
    /// every other path falls through to the acceptor.
    pub fn router(&self) -> Router {
        let state = AppState {
            broadcaster: self.broadcaster.clone(),
            config: self.config.clone(),
            shutdown: self.shutdown.token(),
        };

        Router::new()
            .route("/update-status", post(update_status).fallback(accept))
            .fallback(accept)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local = listener.local_addr()?;
        info!(%local, "status relay listening");

        let app = self.router();
        let token = self.shutdown.token();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                warn!(error = %e, "status relay stopped with error");
            }
            info!("status relay stopped");
        });
        Ok((local, task))
    }

    /// The fan-out and its registry.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
