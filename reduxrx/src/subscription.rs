use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Decides whether two selected values are equal.
pub type Comparer<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Options accepted by `subscribe`.
pub struct SubscribeOptions<T> {
    /// Invoke the listener once with the current selection before `subscribe` returns.
    pub fire_immediately: bool,
    /// Overrides `PartialEq` when deciding whether the selection changed.
    pub comparer: Option<Comparer<T>>,
}

impl<T> Default for SubscribeOptions<T> {
    fn default() -> Self {
        SubscribeOptions {
            fire_immediately: false,
            comparer: None,
        }
    }
}

impl<T> SubscribeOptions<T> {
    pub fn fire_immediately() -> Self {
        SubscribeOptions {
            fire_immediately: true,
            comparer: None,
        }
    }

    pub fn with_comparer<F>(mut self, comparer: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.comparer = Some(Arc::new(comparer));
        self
    }
}

pub(crate) trait Notify<S>: Send + Sync {
    fn notify(&self, state: &S);
}

struct Selection<S, T> {
    selector: Box<dyn Fn(&S) -> T + Send + Sync>,
    listener: Box<dyn Fn(&T) + Send + Sync>,
    comparer: Comparer<T>,
    last: Mutex<T>,
}

impl<S, T> Notify<S> for Selection<S, T>
where
    T: Clone + Send + 'static,
{
    fn notify(&self, state: &S) {
        let selected = (self.selector)(state);
        let changed = {
            let mut last = self.last.lock();
            if (self.comparer)(&last, &selected) {
                false
            } else {
                *last = selected.clone();
                true
            }
        };
        if changed {
            (self.listener)(&selected);
        }
    }
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;

    fn contains(&self, id: u64) -> bool;
}

/// The listeners registered on one state source.
pub(crate) struct SubscriberSet<S> {
    entries: Mutex<Vec<(u64, Arc<dyn Notify<S>>)>>,
    next_id: AtomicU64,
}

impl<S: 'static> SubscriberSet<S> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(SubscriberSet {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Registers a selector/listener pair primed with the current selection.
    pub(crate) fn add<T, F, L>(
        self: &Arc<Self>,
        current: &S,
        selector: F,
        listener: L,
        options: SubscribeOptions<T>,
    ) -> Subscription
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
        L: Fn(&T) + Send + Sync + 'static,
    {
        let selected = selector(current);
        let comparer: Comparer<T> = match options.comparer {
            Some(comparer) => comparer,
            None => Arc::new(|a: &T, b: &T| a == b),
        };
        let entry = Arc::new(Selection {
            selector: Box::new(selector),
            listener: Box::new(listener),
            comparer,
            last: Mutex::new(selected.clone()),
        });
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notify: Arc<dyn Notify<S>> = entry.clone();
        self.entries.lock().push((id, notify));
        if options.fire_immediately {
            (entry.listener)(&selected);
        }
        let registry: Arc<dyn Detach> = self.clone();
        Subscription {
            id,
            registry: Mutex::new(Some(Arc::downgrade(&registry))),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Notifies every listener registered at the time of the call.
    ///
    /// `state` is read again for each listener so that a listener never sees
    /// a value older than the one a nested dispatch already delivered.
    /// A panicking listener is logged and skipped.
    pub(crate) fn notify_all(&self, state: impl Fn() -> S) {
        let snapshot: Vec<Arc<dyn Notify<S>>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, entry)| entry.clone())
            .collect();
        for entry in snapshot {
            let current = state();
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| entry.notify(&current))) {
                tracing::error!(
                    panic = %crate::error::panic_message(payload.as_ref()),
                    "subscriber panicked while being notified"
                );
            }
        }
    }
}

impl<S: 'static> Detach for SubscriberSet<S> {
    fn detach(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.lock().iter().any(|(entry_id, _)| *entry_id == id)
    }
}

/// Handle to a registered listener.
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it. Unsubscribing twice, or after
/// the store is gone, is a no-op.
pub struct Subscription {
    id: u64,
    registry: Mutex<Option<Weak<dyn Detach>>>,
}

impl Subscription {
    pub(crate) fn detached() -> Self {
        Subscription {
            id: 0,
            registry: Mutex::new(None),
        }
    }

    /// Removes the listener. Returns whether it was still registered.
    pub fn unsubscribe(&self) -> bool {
        let registry = self.registry.lock().take();
        registry
            .and_then(|registry| registry.upgrade())
            .map_or(false, |registry| registry.detach(self.id))
    }

    /// True while the listener is registered on a live store.
    pub fn is_valid(&self) -> bool {
        self.registry
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .map_or(false, |registry| registry.contains(self.id))
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn belongs_to<S: 'static>(&self, set: &Arc<SubscriberSet<S>>) -> bool {
        let target: Arc<dyn Detach> = set.clone();
        self.registry
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .map_or(false, |registry| Arc::ptr_eq(&registry, &target))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}
