//! Metric names recorded by the ingestion gateway.

/// Valid status reports accepted (counter, label: status).
pub const STATUS_UPDATES_TOTAL: &str = "ingest_status_updates_total";
/// Reports refused by validation (counter, label: reason).
pub const REJECTIONS_TOTAL: &str = "ingest_rejections_total";
/// Relay notifications that failed (counter).
pub const NOTIFY_FAILURES_TOTAL: &str = "ingest_notify_failures_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_prefix() {
        for name in [STATUS_UPDATES_TOTAL, REJECTIONS_TOTAL, NOTIFY_FAILURES_TOTAL] {
            assert!(name.starts_with("ingest_"));
            assert!(name.ends_with("_total"));
        }
    }
}
