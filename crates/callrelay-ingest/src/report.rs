//! Validation of incoming bot reports.

use callrelay_core::{BotStatus, StatusUpdate};
use serde_json::Value;

use crate::error::IngestError;

/// Turn a raw report body into a [`StatusUpdate`].
///
/// `status` is checked before `callId`, so a report with both wrong is
/// rejected for its status. Only integer status codes are accepted and
/// `callId` must be a non-empty string.
pub fn parse_report(body: &[u8]) -> Result<StatusUpdate, IngestError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| IngestError::Malformed(e.to_string()))?;
    if value.is_null() {
        return Err(IngestError::Malformed("report is null".into()));
    }

    let status = value
        .get("status")
        .and_then(Value::as_i64)
        .and_then(|code| BotStatus::from_code(code).ok())
        .ok_or(IngestError::InvalidStatus)?;

    let call_id = value
        .get("callId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(IngestError::MissingCallId)?;

    Ok(StatusUpdate::new(call_id, status))
}
