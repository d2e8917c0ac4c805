//! # callrelay-server
//!
//! Axum HTTP + `WebSocket` relay for bot call-status updates.
//!
//! - `POST /update-status`: reads the whole body and fans it out, verbatim, to
//!   every open subscriber; always acknowledges once the body was read
//! - `WebSocket` upgrade on any path: registers a subscriber that receives
//!   every subsequent notification
//! - Every other request: plain-text liveness response
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod event;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use error::ServerError;
pub use event::StatusEvent;
pub use server::RelayServer;
