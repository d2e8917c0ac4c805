//! HTTP handlers: notification endpoint, connection acceptor, liveness.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use metrics::{counter, histogram};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::event::StatusEvent;
use crate::metrics::{
    NOTIFICATION_BYTES, NOTIFICATION_READ_ERRORS_TOTAL, NOTIFICATIONS_TOTAL,
    SUBSCRIBER_REJECTIONS_TOTAL,
};
use crate::websocket::broadcast::Broadcaster;
use crate::websocket::session::run_subscriber_session;
use crate::websocket::subscriber::SubscriberId;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Fan-out over the subscriber registry.
    pub broadcaster: Arc<Broadcaster>,
    /// Relay configuration.
    pub config: Arc<ServerConfig>,
    /// Root shutdown token; sessions derive child tokens from it.
    pub shutdown: CancellationToken,
}

/// `POST /update-status`
///
/// Reads the whole body, relays it verbatim and acknowledges. The ack does not
/// depend on how many subscribers received the event.
pub async fn update_status(
    State(state): State<AppState>,
    body: Body,
) -> Result<Json<Value>, ServerError> {
    let payload = axum::body::to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(|e| {
            counter!(NOTIFICATION_READ_ERRORS_TOTAL).increment(1);
            warn!(error = %e, "failed to read notification body");
            ServerError::BodyRead(e.to_string())
        })?;

    let event = StatusEvent::new(payload);
    counter!(NOTIFICATIONS_TOTAL).increment(1);
    #[allow(clippy::cast_precision_loss)]
    let size = event.len() as f64;
    histogram!(NOTIFICATION_BYTES).record(size);

    let report = state.broadcaster.broadcast(&event);
    info!(
        bytes = event.len(),
        recipients = report.attempted,
        delivered = report.delivered,
        "status notification relayed"
    );

    Ok(Json(json!({ "message": state.config.ack_message })))
}

/// Fallback for every request the notification route does not take.
///
/// `WebSocket` upgrade requests become subscribers; anything else gets the
/// liveness text.
pub async fn accept(State(state): State<AppState>, req: Request) -> Response {
    if !is_upgrade_request(req.headers()) {
        debug!(method = %req.method(), path = req.uri().path(), "liveness check");
        return liveness(&state);
    }

    let (mut parts, _body) = req.into_parts();
    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => ws,
        Err(rejection) => {
            counter!(SUBSCRIBER_REJECTIONS_TOTAL, "reason" => "handshake").increment(1);
            warn!(path = parts.uri.path(), error = %rejection, "rejected websocket handshake");
            return rejection.into_response();
        }
    };

    if state.shutdown.is_cancelled() {
        counter!(SUBSCRIBER_REJECTIONS_TOTAL, "reason" => "shutdown").increment(1);
        return (StatusCode::SERVICE_UNAVAILABLE, "relay is shutting down").into_response();
    }

    let limit = state.config.max_subscribers;
    if limit > 0 && state.broadcaster.subscriber_count() >= limit {
        counter!(SUBSCRIBER_REJECTIONS_TOTAL, "reason" => "capacity").increment(1);
        warn!(limit, "subscriber limit reached, refusing upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "subscriber limit reached").into_response();
    }

    let id = SubscriberId::new();
    debug!(subscriber_id = %id, path = parts.uri.path(), "upgrading subscriber connection");
    let AppState {
        broadcaster,
        config,
        shutdown,
    } = state;
    ws.on_failed_upgrade(|e| warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| {
            run_subscriber_session(socket, id, broadcaster, config, shutdown)
        })
}

fn liveness(state: &AppState) -> Response {
    (StatusCode::OK, state.config.liveness_message.clone()).into_response()
}

/// Whether the request asks for a `WebSocket` upgrade (`Upgrade: websocket`,
/// case-insensitive).
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"))
}
