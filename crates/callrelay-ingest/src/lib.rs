//! # callrelay-ingest
//!
//! Bot-status ingestion gateway.
//!
//! - `POST /api/bot-status`: validates `{ callId, status }`, maps the status
//!   code to its user-facing message and forwards the resulting
//!   [`StatusUpdate`](callrelay_core::StatusUpdate) to the relay
//! - The relay call is best-effort: failures are logged, never surfaced to the
//!   bot
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod notifier;
pub mod report;
pub mod server;

pub use config::IngestConfig;
pub use error::IngestError;
pub use notifier::{NotifyError, RelayNotifier, StatusNotifier};
pub use report::parse_report;
pub use server::IngestServer;
