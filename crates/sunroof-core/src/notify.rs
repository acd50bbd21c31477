//! Observer list used for pending-count fan-out.
//!
//! Listeners run in registration order. A panicking listener is caught and
//! logged so the remaining listeners still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};

type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// A registration-ordered set of listeners for values of type `T`.
pub struct ListenerRegistry<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T: Clone + 'static> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers `listener` and returns the handle that removes it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    let mut registry = inner.lock().unwrap_or_else(|e| e.into_inner());
                    registry.listeners.retain(|(listener_id, _)| *listener_id != id);
                }
            })),
        }
    }

    /// Invokes every listener with `value`.
    ///
    /// The listener list is snapshotted first, so a listener may unsubscribe
    /// itself (or others) without deadlocking.
    pub fn notify(&self, value: T) {
        let snapshot: Vec<Listener<T>> = {
            let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            registry
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };

        for listener in snapshot {
            let value = value.clone();
            if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
                tracing::warn!("[ListenerRegistry] Listener panicked; continuing with the rest");
            }
        }
    }

    pub fn len(&self) -> usize {
        let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        registry.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + 'static> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`. Call [`Subscription::unsubscribe`] to stop
/// receiving notifications; dropping the handle leaves the listener in place.
#[must_use = "keep the subscription to be able to unsubscribe later"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
