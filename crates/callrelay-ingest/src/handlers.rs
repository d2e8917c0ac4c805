//! `POST /api/bot-status`

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use metrics::counter;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::IngestError;
use crate::metrics::{NOTIFY_FAILURES_TOTAL, REJECTIONS_TOTAL, STATUS_UPDATES_TOTAL};
use crate::notifier::StatusNotifier;
use crate::report::parse_report;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct IngestState {
    /// Where accepted updates are forwarded.
    pub notifier: Arc<dyn StatusNotifier>,
}

/// Accept a bot report, notify the relay and echo the mapped status.
///
/// The relay call is awaited but its outcome never changes the response.
pub async fn bot_status(
    State(state): State<IngestState>,
    body: Bytes,
) -> Result<Json<Value>, IngestError> {
    let update = parse_report(&body).inspect_err(|e| {
        counter!(REJECTIONS_TOTAL, "reason" => e.reason()).increment(1);
        warn!(error = %e, bytes = body.len(), "rejected bot report");
    })?;

    info!(
        call_id = %update.call_id,
        status = update.status.code(),
        message = %update.message,
        "bot status received"
    );
    counter!(STATUS_UPDATES_TOTAL, "status" => update.status.code().to_string()).increment(1);

    if let Err(e) = state.notifier.notify(&update).await {
        counter!(NOTIFY_FAILURES_TOTAL).increment(1);
        warn!(call_id = %update.call_id, error = %e, "failed to notify relay");
    }

    Ok(Json(json!({
        "success": true,
        "receivedStatus": update.status.code(),
        "message": update.message,
    })))
}
