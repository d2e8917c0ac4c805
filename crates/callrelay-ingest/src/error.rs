//! Ingestion error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use crate::notifier::NotifyError;

/// Errors surfaced by the ingestion gateway.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request body was not JSON (or was `null`).
    #[error("malformed report: {0}")]
    Malformed(String),
    /// `status` missing or outside `1..=5`.
    #[error("Invalid status provided")]
    InvalidStatus,
    /// `callId` missing, empty or not a string.
    #[error("callId is required")]
    MissingCallId,
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
    /// The relay notifier could not be constructed.
    #[error(transparent)]
    Notifier(#[from] NotifyError),
}

impl IngestError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::InvalidStatus => "invalid_status",
            Self::MissingCallId => "missing_call_id",
            Self::Bind { .. } | Self::Io(_) | Self::Notifier(_) => "internal",
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidStatus | Self::MissingCallId => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal details stay in the logs.
        let message = if status.is_client_error() {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
