//! # callrelay-core
//!
//! Shared vocabulary for the call-status relay crates:
//!
//! - **Bot status**: [`BotStatus`] enum (codes 1–5) with the user-facing messages
//! - **Status updates**: [`StatusUpdate`], the JSON payload forwarded to the relay
//! - **Logging**: [`logging::init_subscriber`] for the global `tracing` subscriber

#![deny(unsafe_code)]

pub mod logging;
pub mod status;

pub use logging::{LogFormat, init_subscriber};
pub use status::{BotStatus, InvalidStatus, StatusUpdate};
