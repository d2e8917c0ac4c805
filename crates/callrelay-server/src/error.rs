//! Relay error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the relay.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// I/O error on an already-bound listener.
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),
    /// The notification body could not be read.
    #[error("failed to read notification body: {0}")]
    BodyRead(String),
    /// The Prometheus recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        // Only BodyRead reaches a client; the rest fail startup.
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
