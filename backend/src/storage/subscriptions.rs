//! Real-time listeners for per-period result sets.
//!
//! Listeners are invoked while the hub lock is held. `unsubscribe` takes the
//! same lock, so once it returns no delivery for that subscription is running
//! and none can start.

use shared::{Period, Transaction};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::traits::ChangeListener;

#[derive(Default)]
struct HubState {
    next_id: u64,
    listeners: BTreeMap<u64, (Period, ChangeListener)>,
}

/// Registry of active listeners, shared by every repository of a connection
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    state: Arc<Mutex<HubState>>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a listener and hand it the initial result set
    pub fn register(
        &self,
        period: Period,
        listener: ChangeListener,
        initial: &[Transaction],
    ) -> Subscription {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        listener(initial);
        state.listeners.insert(id, (period, listener));
        debug!("Subscription {} registered for {} ({} active)", id, period, state.listeners.len());

        Subscription {
            id,
            period,
            hub: self.clone(),
        }
    }

    /// Push the new result set of `period` to its listeners
    pub fn publish(&self, period: Period, records: &[Transaction]) {
        let state = self.lock();
        let mut delivered = 0;
        for (subscribed_period, listener) in state.listeners.values() {
            if *subscribed_period == period {
                listener(records);
                delivered += 1;
            }
        }
        debug!("Published {} records for {} to {} listeners", records.len(), period, delivered);
    }

    pub fn active_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn active_periods(&self) -> Vec<Period> {
        self.lock().listeners.values().map(|(period, _)| *period).collect()
    }

    fn remove(&self, id: u64) -> bool {
        self.lock().listeners.remove(&id).is_some()
    }
}

/// Handle to an active subscription; dropping it unsubscribes
pub struct Subscription {
    id: u64,
    period: Period,
    hub: SubscriptionHub,
}

impl Subscription {
    pub fn period(&self) -> Period {
        self.period
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.hub.remove(self.id) {
            debug!("Subscription {} for {} removed", self.id, self.period);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("period", &self.period)
            .finish()
    }
}
