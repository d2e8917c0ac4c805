//! `WebSocket` subscriber management and status fan-out.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `subscriber` | Per-connection handle: ID, liveness state, outbound queue |
//! | `registry` | Synchronized subscriber set (`add` / `remove` / `snapshot`) |
//! | `broadcast` | Fan-out of one [`StatusEvent`](crate::StatusEvent) to every open subscriber |
//! | `session` | Lifecycle of one upgraded connection, from registration to cleanup |
//!
//! ## Data Flow
//!
//! `POST /update-status` → `broadcast` → per-subscriber queue → `session`
//! writer task → socket.

pub mod broadcast;
pub mod registry;
pub mod session;
pub mod subscriber;
