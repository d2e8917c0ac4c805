//! The opaque payload relayed to subscribers.

use bytes::Bytes;

/// One status notification, exactly as received.
///
/// The relay never parses or re-serializes it. Cloning is a reference-count
/// bump, so every subscriber gets the same underlying buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEvent(Bytes);

impl StatusEvent {
    /// Wrap a received body.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self(payload.into())
    }

    /// Raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for StatusEvent {
    fn from(payload: Bytes) -> Self {
        Self(payload)
    }
}
