//! Change notification for registry observers.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;

use uuid::Uuid;

/// Callback invoked with no arguments whenever any form changes.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Unique identifier for a registered subscriber.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Create a new unique subscriber ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscribers in registration order.
#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Mutex<Vec<(SubscriberId, Callback)>>,
}

impl Subscribers {
    pub(crate) fn add(&self, callback: Callback) -> SubscriberId {
        let id = SubscriberId::new();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, callback));
        id
    }

    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(entry, _)| *entry == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Calls every subscriber once, in registration order.
    ///
    /// Callbacks run outside the lock, so they may subscribe, unsubscribe
    /// or read the registry.
    pub(crate) fn notify(&self) {
        let callbacks: Vec<Callback> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}

/// Handle returned by [`FormRegistry::subscribe`](crate::FormRegistry::subscribe).
///
/// Dropping the handle keeps the subscription alive; call
/// [`unsubscribe`](Self::unsubscribe) to stop notifications.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriberId,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, subscribers: &Arc<Subscribers>) -> Self {
        Self {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    /// The subscriber's ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Stops notifications.
    ///
    /// Safe to call repeatedly; returns `true` only for the call that
    /// actually removed the callback. In-flight validations are unaffected.
    pub fn unsubscribe(&self) -> bool {
        self.subscribers
            .upgrade()
            .is_some_and(|subscribers| subscribers.remove(self.id))
    }

    /// Returns `true` while the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.subscribers
            .upgrade()
            .is_some_and(|subscribers| subscribers.contains(self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
