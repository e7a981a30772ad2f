//! DataBind - an observable value with an ordered listener list.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

type Listener<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

struct Inner<T> {
    value: RwLock<T>,
    listeners: RwLock<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
}

/// A value that notifies its listeners, in subscription order, on every
/// [`set`](DataBind::set).
///
/// Listeners run on the thread that calls `set`, without any internal lock
/// held, so a listener may read the bus, subscribe, or drop subscriptions.
/// The listener list is snapshotted per notification.
pub struct DataBind<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + Sync + 'static> DataBind<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                value: RwLock::new(value),
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Listen for new values.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_with_old(move |new, _old| listener(new))
    }

    /// Listen for `(new, old)` value pairs.
    pub fn subscribe_with_old<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner
                        .listeners
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|(listener_id, _)| *listener_id != id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Store a value without notifying anyone.
    pub fn set_silently(&self, value: T) {
        *self.inner.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Borrow the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.inner.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&*value)
    }

    fn listeners(&self) -> Vec<Listener<T>> {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

impl<T: Clone + Send + Sync + 'static> DataBind<T> {
    /// Store `value` and notify every listener.
    pub fn set(&self, value: T) {
        let old = mem::replace(
            &mut *self.inner.value.write().unwrap_or_else(PoisonError::into_inner),
            value.clone(),
        );
        for listener in self.listeners() {
            listener(&value, &old);
        }
    }

    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: Default + Send + Sync + 'static> Default for DataBind<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for DataBind<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Keep the listener for the lifetime of the bus.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
