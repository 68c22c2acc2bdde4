//! Event fan-out to independent application subscribers.
//!
//! The bus decouples inbound-message and connection-lifecycle notification
//! from the many UI/state consumers. Categories are plain strings; any
//! component may publish or subscribe to any category, including ones with
//! no current listeners.
//!
//! Subscriber invocations are isolated from each other: a panicking
//! subscriber is reported and skipped, and never prevents the remaining
//! subscribers of the same publish from running, nor reaches the publisher.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{trace, warn};

type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

struct BusInner {
    listeners: Mutex<HashMap<String, Vec<(u64, Callback)>>>,
    next_id: AtomicU64,
}

/// String-keyed publish/subscribe registry.
///
/// Cheap to clone; all clones share the same subscriber sets.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Calling [`Subscription::unsubscribe`] removes exactly the listener that
/// produced it. Dropping the handle without calling it leaves the listener
/// registered.
pub struct Subscription {
    bus: Weak<BusInner>,
    category: String,
    id: u64,
}

impl Subscription {
    /// Remove this listener from its category's set.
    ///
    /// Other subscriptions to the same category are unaffected. Safe to
    /// call after the bus itself has been dropped.
    pub fn unsubscribe(self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut listeners = bus.listeners.lock();
        if let Some(set) = listeners.get_mut(&self.category) {
            set.retain(|(id, _)| *id != self.id);
            if set.is_empty() {
                let _ = listeners.remove(&self.category);
            }
        }
    }
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register `callback` for `category`, creating the set if absent.
    ///
    /// Multiple subscriptions to the same category coexist independently;
    /// each is removable through its own [`Subscription`].
    pub fn subscribe(
        &self,
        category: &str,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.inner.listeners.lock();
        listeners
            .entry(category.to_string())
            .or_default()
            .push((id, Arc::new(callback)));
        Subscription {
            bus: Arc::downgrade(&self.inner),
            category: category.to_string(),
            id,
        }
    }

    /// Invoke every current subscriber for `category` with `payload`.
    ///
    /// The subscriber set is snapshotted before dispatch, so callbacks may
    /// subscribe or unsubscribe without deadlocking; such changes take
    /// effect from the next publish. No ordering is promised across
    /// subscribers. A publish to a category with no listeners is a no-op.
    pub fn publish(&self, category: &str, payload: &Value) {
        let snapshot: Vec<Callback> = {
            let listeners = self.inner.listeners.lock();
            match listeners.get(category) {
                Some(set) => set.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return,
            }
        };

        trace!(category, subscribers = snapshot.len(), "publish");
        for callback in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                warn!(category, panic = %detail, "subscriber panicked during publish");
            }
        }
    }

    /// Number of listeners currently registered for `category`.
    #[must_use]
    pub fn subscriber_count(&self, category: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .get(category)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
