//! Subscriber session lifecycle: one upgraded connection from registration
//! through cleanup.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::broadcast::Broadcaster;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::ServerConfig;
use crate::event::StatusEvent;
use crate::metrics::{
    SUBSCRIBER_CONNECTION_DURATION_SECONDS, SUBSCRIBER_CONNECTIONS_TOTAL,
    SUBSCRIBER_DISCONNECTIONS_TOTAL, SUBSCRIBERS_ACTIVE,
};

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hangup {
    /// Client sent a close frame or the stream ended.
    ClientClosed,
    /// Read or write failed.
    TransportError,
    /// No frame (pong included) within the pong timeout.
    Unresponsive,
    /// Closed by the relay (shutdown or failed delivery).
    ServerClosed,
}

/// Serve one subscriber until it disconnects.
///
/// Registers the subscriber before reading anything, forwards queued events
/// from a dedicated writer task, pings on an interval and drops the client
/// once it has been silent longer than the pong timeout. Inbound frames only
/// refresh liveness; their content is ignored. On exit the subscriber is
/// deregistered exactly once.
#[instrument(skip_all, fields(subscriber_id = %id))]
pub async fn run_subscriber_session(
    ws: WebSocket,
    id: SubscriberId,
    broadcaster: Arc<Broadcaster>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) {
    let (tx, mut rx) = mpsc::channel::<StatusEvent>(config.send_queue_capacity.max(1));
    let subscriber = Arc::new(Subscriber::new(id.clone(), tx, shutdown.child_token()));

    if !broadcaster.registry().add(subscriber.clone()) {
        warn!("duplicate subscriber id, refusing session");
        return;
    }
    info!(active = broadcaster.subscriber_count(), "subscriber connected");
    counter!(SUBSCRIBER_CONNECTIONS_TOTAL).increment(1);
    record_active(&broadcaster);

    let (mut ws_tx, mut ws_rx) = ws.split();

    let writer_sub = subscriber.clone();
    let ping_every = config.ping_interval();
    let pong_timeout = config.pong_timeout();
    let mut outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_every);
        // First tick fires immediately.
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        return Hangup::ServerClosed;
                    };
                    if ws_tx.send(to_frame(event)).await.is_err() {
                        return Hangup::TransportError;
                    }
                }
                _ = ping.tick() => {
                    if writer_sub.last_seen_elapsed() > pong_timeout {
                        warn!(timeout = ?pong_timeout, "subscriber unresponsive, disconnecting");
                        return Hangup::Unresponsive;
                    }
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        return Hangup::TransportError;
                    }
                }
                () = writer_sub.closed() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return Hangup::ServerClosed;
                }
            }
        }
    });

    let inbound_sub = subscriber.clone();
    let inbound = async move {
        loop {
            match ws_rx.next().await {
                Some(Ok(Message::Close(_))) | None => return Hangup::ClientClosed,
                Some(Ok(_)) => inbound_sub.mark_seen(),
                Some(Err(e)) => {
                    debug!(error = %e, "subscriber read failed");
                    return Hangup::TransportError;
                }
            }
        }
    };

    let reason = tokio::select! {
        reason = inbound => reason,
        joined = &mut outbound => joined.unwrap_or(Hangup::TransportError),
    };
    outbound.abort();

    subscriber.close();
    subscriber.mark_closed();
    let _ = broadcaster.registry().remove(&id);

    info!(
        ?reason,
        dropped_events = subscriber.dropped_events(),
        active = broadcaster.subscriber_count(),
        "subscriber disconnected"
    );
    counter!(SUBSCRIBER_DISCONNECTIONS_TOTAL).increment(1);
    histogram!(SUBSCRIBER_CONNECTION_DURATION_SECONDS).record(subscriber.age().as_secs_f64());
    record_active(&broadcaster);
}

/// Text frame for UTF-8 payloads, binary otherwise.
fn to_frame(event: StatusEvent) -> Message {
    if let Some(text) = event.as_text() {
        return Message::Text(text.into());
    }
    Message::Binary(event.into_bytes())
}

fn record_active(broadcaster: &Broadcaster) {
    #[allow(clippy::cast_precision_loss)]
    let active = broadcaster.subscriber_count() as f64;
    gauge!(SUBSCRIBERS_ACTIVE).set(active);
}
