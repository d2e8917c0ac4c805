//! Connected subscriber state.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::event::StatusEvent;

/// Unique subscriber identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Fresh time-ordered ID (`sub_<uuid v7>`).
    pub fn new() -> Self {
        Self(format!("sub_{}", Uuid::now_v7()))
    }

    /// ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Liveness of a subscriber connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SubscriberState {
    /// Accepting events.
    Open = 0,
    /// Shutting down; events are skipped.
    Closing = 1,
    /// Gone.
    Closed = 2,
}

impl SubscriberState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Open,
            1 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Why an event could not be queued for a subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendFailure {
    /// The outbound queue is full; this event is missed.
    QueueFull,
    /// The writer task is gone; the connection is dead.
    Disconnected,
}

/// Represents one connected `WebSocket` subscriber.
pub struct Subscriber {
    /// Unique subscriber ID.
    pub id: SubscriberId,
    /// Queue drained by the connection's writer task.
    tx: mpsc::Sender<StatusEvent>,
    state: AtomicU8,
    /// Cancelled when the subscriber is closed from outside its session.
    closed: CancellationToken,
    /// When the connection was established.
    pub connected_at: Instant,
    /// Last frame (including pongs) received from the client.
    last_seen: Mutex<Instant>,
    /// Events missed because the queue was full.
    dropped_events: AtomicU64,
}

impl Subscriber {
    /// Create an open subscriber.
    ///
    /// `closed` is usually a child of the server shutdown token so that
    /// shutting down closes every subscriber.
    pub fn new(id: SubscriberId, tx: mpsc::Sender<StatusEvent>, closed: CancellationToken) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            state: AtomicU8::new(SubscriberState::Open as u8),
            closed,
            connected_at: now,
            last_seen: Mutex::new(now),
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Current liveness state.
    pub fn state(&self) -> SubscriberState {
        SubscriberState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether events should be sent to this subscriber.
    pub fn is_open(&self) -> bool {
        self.state() == SubscriberState::Open && !self.closed.is_cancelled()
    }

    /// Queue an event without waiting.
    pub fn send(&self, event: StatusEvent) -> Result<(), SendFailure> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let _ = self.dropped_events.fetch_add(1, Ordering::Relaxed);
                Err(SendFailure::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendFailure::Disconnected),
        }
    }

    /// Move to `Closing` and signal the session to hang up.
    ///
    /// No-op unless the subscriber is still `Open`.
    pub fn close(&self) {
        let _ = self.state.compare_exchange(
            SubscriberState::Open as u8,
            SubscriberState::Closing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.closed.cancel();
    }

    /// Mark the connection as fully gone.
    pub fn mark_closed(&self) {
        self.state.store(SubscriberState::Closed as u8, Ordering::Release);
    }

    /// Resolves once [`close`](Self::close) is called or the parent token is cancelled.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Record inbound activity.
    pub fn mark_seen(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or connection establishment).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Events missed because the queue was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("dropped_events", &self.dropped_events())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_subscriber(capacity: usize) -> (Subscriber, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let sub = Subscriber::new(SubscriberId::new(), tx, CancellationToken::new());
        (sub, rx)
    }

    #[test]
    fn ids_are_unique_and_prefixed() {
        let a = SubscriberId::new();
        let b = SubscriberId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("sub_"));
        assert_eq!(a.to_string(), a.as_str());
    }

    #[test]
    fn new_subscriber_is_open() {
        let (sub, _rx) = make_subscriber(4);
        assert_eq!(sub.state(), SubscriberState::Open);
        assert!(sub.is_open());
    }

    #[tokio::test]
    async fn send_queues_event() {
        let (sub, mut rx) = make_subscriber(4);
        sub.send(StatusEvent::new("hello")).unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.as_bytes(), b"hello");
    }

    #[test]
    fn send_to_full_queue_is_missed() {
        let (sub, _rx) = make_subscriber(1);
        assert!(sub.send(StatusEvent::new("a")).is_ok());
        assert_eq!(sub.send(StatusEvent::new("b")), Err(SendFailure::QueueFull));
        assert_eq!(sub.dropped_events(), 1);
        assert!(sub.is_open());
    }

    #[test]
    fn send_to_dropped_receiver_is_disconnected() {
        let (sub, rx) = make_subscriber(4);
        drop(rx);
        assert_eq!(
            sub.send(StatusEvent::new("a")),
            Err(SendFailure::Disconnected)
        );
        assert_eq!(sub.dropped_events(), 0);
    }

    #[test]
    fn close_moves_to_closing() {
        let (sub, _rx) = make_subscriber(4);
        sub.close();
        assert_eq!(sub.state(), SubscriberState::Closing);
        assert!(!sub.is_open());
    }

    #[test]
    fn close_after_closed_keeps_closed() {
        let (sub, _rx) = make_subscriber(4);
        sub.mark_closed();
        sub.close();
        assert_eq!(sub.state(), SubscriberState::Closed);
    }

    #[test]
    fn parent_cancellation_closes() {
        let parent = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(4);
        let sub = Subscriber::new(SubscriberId::new(), tx, parent.child_token());
        assert!(sub.is_open());
        parent.cancel();
        assert!(!sub.is_open());
    }

    #[tokio::test]
    async fn closed_future_resolves_on_close() {
        let (sub, _rx) = make_subscriber(4);
        sub.close();
        tokio::time::timeout(Duration::from_secs(1), sub.closed())
            .await
            .unwrap();
    }

    #[test]
    fn mark_seen_resets_elapsed() {
        let (sub, _rx) = make_subscriber(4);
        std::thread::sleep(Duration::from_millis(20));
        let before = sub.last_seen_elapsed();
        sub.mark_seen();
        assert!(sub.last_seen_elapsed() < before);
    }

    #[test]
    fn age_increases() {
        let (sub, _rx) = make_subscriber(4);
        let age1 = sub.age();
        std::thread::sleep(Duration::from_millis(10));
        assert!(sub.age() > age1);
    }
}
