//! Fan-out of one status event to every open subscriber.

use metrics::{counter, gauge};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::registry::SubscriberRegistry;
use super::subscriber::SendFailure;
use crate::event::StatusEvent;
use crate::metrics::{
    FANOUT_DELIVERIES_TOTAL, FANOUT_DROPS_TOTAL, FANOUT_FAILURES_TOTAL, SUBSCRIBERS_ACTIVE,
};

/// Outcome of a single [`Broadcaster::broadcast`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Open subscribers a send was attempted on.
    pub attempted: usize,
    /// Sends that were queued.
    pub delivered: usize,
    /// Subscribers that missed the event because their queue was full.
    pub dropped: usize,
    /// Subscribers found disconnected and removed.
    pub failed: usize,
    /// Members that were already closing and got nothing.
    pub skipped: usize,
}

/// Delivers every notification to the registered subscribers.
///
/// Broadcasts are serialized, so two notifications reach every subscriber in
/// the same relative order. Sends never block: a subscriber that is slow to
/// drain its queue misses events instead of stalling the others.
#[derive(Default)]
pub struct Broadcaster {
    registry: SubscriberRegistry,
    order: Mutex<()>,
}

impl Broadcaster {
    /// Create a broadcaster with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The subscriber set this broadcaster delivers to.
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Queue `event` for every open subscriber present at call time.
    ///
    /// A subscriber whose connection is gone is closed and deregistered; the
    /// remaining subscribers still receive the event.
    pub fn broadcast(&self, event: &StatusEvent) -> FanoutReport {
        let _order = self.order.lock();
        let members = self.registry.snapshot();
        let mut report = FanoutReport::default();

        for sub in &members {
            if !sub.is_open() {
                report.skipped += 1;
                continue;
            }
            report.attempted += 1;
            match sub.send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(SendFailure::QueueFull) => {
                    report.dropped += 1;
                    warn!(
                        subscriber_id = %sub.id,
                        dropped_total = sub.dropped_events(),
                        "subscriber queue full, event missed"
                    );
                }
                Err(SendFailure::Disconnected) => {
                    report.failed += 1;
                    sub.close();
                    if self.registry.remove(&sub.id).is_some() {
                        debug!(subscriber_id = %sub.id, "removed disconnected subscriber");
                    }
                }
            }
        }

        counter!(FANOUT_DELIVERIES_TOTAL).increment(report.delivered as u64);
        if report.dropped > 0 {
            counter!(FANOUT_DROPS_TOTAL).increment(report.dropped as u64);
        }
        if report.failed > 0 {
            counter!(FANOUT_FAILURES_TOTAL).increment(report.failed as u64);
            #[allow(clippy::cast_precision_loss)]
            let active = self.registry.len() as f64;
            gauge!(SUBSCRIBERS_ACTIVE).set(active);
        }
        debug!(
            bytes = event.len(),
            recipients = members.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            failed = report.failed,
            "status event broadcast"
        );
        report
    }
}
