//! Change-notification bus.
//!
//! Delivers content-change paths to subscribed listeners. The bus outlives
//! individual requests, so every subscription a listener fails to release
//! leaks for the remainder of the process; engines detach themselves
//! through [`unsubscribe`](ChangeBus::unsubscribe) exactly once (see
//! [`RefreshPolicyEngine`](crate::RefreshPolicyEngine)).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use metrics::counter;
use tracing::debug;

use crate::lock::mutex_lock;

const SOURCE: &str = "rendercache::bus";

const METRIC_CHANGE_NOTIFICATIONS: &str = "rendercache_change_notifications_total";
const METRIC_CHANGE_MATCHES: &str = "rendercache_change_matches_total";

/// Listener offered every content-change path.
pub trait ChangeListener: Send + Sync {
    /// Returns true when the change invalidates the listener's entry.
    fn on_change_notification(&self, path: &str) -> bool;
}

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// In-process change-notification bus.
#[derive(Default)]
pub struct ChangeBus {
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn ChangeListener>)>>,
    id_counter: AtomicU64,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            id_counter: AtomicU64::new(0),
        }
    }

    /// Add a listener; the returned id removes it again.
    pub fn subscribe(&self, listener: Arc<dyn ChangeListener>) -> SubscriptionId {
        let id = SubscriptionId(self.id_counter.fetch_add(1, Ordering::SeqCst));
        mutex_lock(&self.listeners, SOURCE, "subscribe").push((id, listener));
        id
    }

    /// Remove a subscription; unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        mutex_lock(&self.listeners, SOURCE, "unsubscribe")
            .retain(|(subscription, _)| *subscription != id);
    }

    /// Offer a changed path to every live listener.
    ///
    /// Returns the number of listeners that reported a match. Delivery
    /// happens on a snapshot taken outside the lock so listeners may
    /// unsubscribe re-entrantly.
    pub fn notify(&self, path: &str) -> usize {
        let snapshot: Vec<Arc<dyn ChangeListener>> = mutex_lock(&self.listeners, SOURCE, "notify")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        counter!(METRIC_CHANGE_NOTIFICATIONS).increment(1);

        let matched = snapshot
            .iter()
            .filter(|listener| listener.on_change_notification(path))
            .count();

        if matched > 0 {
            counter!(METRIC_CHANGE_MATCHES).increment(matched as u64);
            debug!(path, matched, "Change notification matched cache entries");
        }
        matched
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        mutex_lock(&self.listeners, SOURCE, "listener_count").len()
    }
}
