//! # callrelay-settings
//!
//! Configuration with layered sources for the relay and the ingestion gateway.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CallrelaySettings::default()`]
//! 2. **User file**: `~/.callrelay/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CALLRELAY_*` overrides (highest priority)
//!
//! The binary applies its command-line flags on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, merge_layer, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
