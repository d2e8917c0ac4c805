//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why settings could not be loaded or are unusable.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Parser error with line and column.
        #[source]
        source: serde_json::Error,
    },
    /// The merged document does not fit the settings schema (wrong types).
    #[error("settings do not match the schema: {0}")]
    Schema(#[from] serde_json::Error),
    /// A value parsed but cannot be run with.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// camelCase path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/callrelay.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/callrelay.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn parse_error_names_file() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("settings.json"),
            source,
        };
        assert!(err.to_string().starts_with("settings.json is not valid JSON"));
    }

    #[test]
    fn invalid_display() {
        let err = SettingsError::invalid("relay.sendQueueCapacity", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid relay.sendQueueCapacity: must be at least 1"
        );
    }
}
