//! The set of connected subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::subscriber::{Subscriber, SubscriberId};

/// Synchronized subscriber set.
///
/// Membership changes only through [`add`](Self::add) and
/// [`remove`](Self::remove); readers take a [`snapshot`](Self::snapshot) and
/// iterate it after the lock is released, so slow sends never hold the lock.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Arc<Subscriber>>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Returns `false` if its ID is already present,
    /// in which case the existing entry is kept.
    pub fn add(&self, subscriber: Arc<Subscriber>) -> bool {
        let mut subs = self.subscribers.write();
        if subs.contains_key(&subscriber.id) {
            return false;
        }
        let _ = subs.insert(subscriber.id.clone(), subscriber);
        true
    }

    /// Deregister a subscriber. Removing an absent ID is a no-op returning `None`.
    pub fn remove(&self, id: &SubscriberId) -> Option<Arc<Subscriber>> {
        self.subscribers.write().remove(id)
    }

    /// Point-in-time copy of the current members.
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.subscribers.read().values().cloned().collect()
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Whether no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}
