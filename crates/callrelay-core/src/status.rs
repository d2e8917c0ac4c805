//! Bot call status codes and the update payload broadcast to browsers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State of an outbound call as reported by the calling bot.
///
/// Serialized as its numeric code (`1`–`5`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum BotStatus {
    /// The bot is dialing.
    Calling = 1,
    /// The callee picked up.
    Connected = 2,
    /// The call finished normally.
    Completed = 3,
    /// Nobody answered.
    NoAnswer = 4,
    /// The bot reported an error.
    Failed = 5,
}

/// A status code outside `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid bot status code: {0}")]
pub struct InvalidStatus(pub i64);

impl BotStatus {
    /// All statuses in code order.
    pub const ALL: [Self; 5] = [
        Self::Calling,
        Self::Connected,
        Self::Completed,
        Self::NoAnswer,
        Self::Failed,
    ];

    /// Numeric wire code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Message shown to the end user for this status.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Calling => "Уже звоню",
            Self::Connected => "Дозвонился",
            Self::Completed => "Звонок успешно завершен",
            Self::NoAnswer => "Не дозвонился",
            Self::Failed => "Ошибка",
        }
    }

    /// Look up a status by code.
    pub fn from_code(code: i64) -> Result<Self, InvalidStatus> {
        Self::ALL
            .into_iter()
            .find(|s| i64::from(s.code()) == code)
            .ok_or(InvalidStatus(code))
    }
}

impl From<BotStatus> for u8 {
    fn from(status: BotStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for BotStatus {
    type Error = InvalidStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(i64::from(code))
    }
}

impl std::fmt::Display for BotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}

/// Payload forwarded to the relay and delivered verbatim to browsers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Identifier of the call this update refers to.
    pub call_id: String,
    /// Reported status.
    pub status: BotStatus,
    /// Human-readable message for `status`.
    pub message: String,
}

impl StatusUpdate {
    /// Build an update whose message is the canonical text for `status`.
    pub fn new(call_id: impl Into<String>, status: BotStatus) -> Self {
        Self {
            call_id: call_id.into(),
            status,
            message: status.message().to_string(),
        }
    }
}
