//! Prometheus metrics recorder and the optional exporter listener.
//!
//! The exporter runs on its own port so the relay port keeps its routing
//! contract (notification path, upgrades, liveness for everything else).

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ServerError;

/// Install the Prometheus metrics recorder (global).
///
/// Must be called once, before any metric is recorded, for the values to be
/// exported. Without a recorder the `metrics` macros are no-ops.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Router serving `GET /metrics` in Prometheus text format.
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Bind the exporter and serve it until `cancel` fires.
pub async fn serve(
    addr: &str,
    handle: PrometheusHandle,
    cancel: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let local = listener.local_addr()?;
    info!(%local, "metrics exporter listening");

    let app = router(handle);
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await
        {
            warn!(error = %e, "metrics exporter stopped with error");
        }
    });
    Ok((local, task))
}

// Metric name constants.

/// Notifications received on `/update-status` (counter).
pub const NOTIFICATIONS_TOTAL: &str = "relay_notifications_total";
/// Notification bodies that could not be read (counter).
pub const NOTIFICATION_READ_ERRORS_TOTAL: &str = "relay_notification_read_errors_total";
/// Notification payload size in bytes (histogram).
pub const NOTIFICATION_BYTES: &str = "relay_notification_bytes";
/// Events queued for a subscriber (counter).
pub const FANOUT_DELIVERIES_TOTAL: &str = "relay_fanout_deliveries_total";
/// Events missed because a subscriber queue was full (counter).
pub const FANOUT_DROPS_TOTAL: &str = "relay_fanout_drops_total";
/// Sends that found the subscriber disconnected (counter).
pub const FANOUT_FAILURES_TOTAL: &str = "relay_fanout_failures_total";
/// Registered subscribers (gauge).
pub const SUBSCRIBERS_ACTIVE: &str = "relay_subscribers_active";
/// Subscriber connections accepted (counter).
pub const SUBSCRIBER_CONNECTIONS_TOTAL: &str = "relay_subscriber_connections_total";
/// Subscriber connections ended (counter).
pub const SUBSCRIBER_DISCONNECTIONS_TOTAL: &str = "relay_subscriber_disconnections_total";
/// Upgrade requests refused (counter, label: reason).
pub const SUBSCRIBER_REJECTIONS_TOTAL: &str = "relay_subscriber_rejections_total";
/// Subscriber connection lifetime in seconds (histogram).
pub const SUBSCRIBER_CONNECTION_DURATION_SECONDS: &str =
    "relay_subscriber_connection_duration_seconds";

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            NOTIFICATIONS_TOTAL,
            NOTIFICATION_READ_ERRORS_TOTAL,
            NOTIFICATION_BYTES,
            FANOUT_DELIVERIES_TOTAL,
            FANOUT_DROPS_TOTAL,
            FANOUT_FAILURES_TOTAL,
            SUBSCRIBERS_ACTIVE,
            SUBSCRIBER_CONNECTIONS_TOTAL,
            SUBSCRIBER_DISCONNECTIONS_TOTAL,
            SUBSCRIBER_REJECTIONS_TOTAL,
            SUBSCRIBER_CONNECTION_DURATION_SECONDS,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
            assert!(name.starts_with("relay_"));
        }
    }

    #[tokio::test]
    async fn metrics_route_renders() {
        // Build a recorder + handle without global install to avoid test conflicts.
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let resp = router(handle)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
