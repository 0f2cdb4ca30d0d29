use crate::subscription::SubscriberSet;
use crate::{
    Action, ActionCreator, AnyValue, PartitionableState, PartitionedState, Reducer, State,
    StoreError, SubscribeOptions, Subscription,
};
use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt, SignalStream};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::any::Any;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// The function a store uses to dispatch actions. Middleware replaces it with
/// a wrapped version.
pub type Dispatcher = Arc<dyn Fn(Action) -> Result<(), StoreError> + Send + Sync>;

type DisposeHook = Box<dyn FnOnce() + Send>;

struct StoreInner<S: State> {
    state: Mutable<S>,
    reducer: Reducer<S>,
    dispatcher: RwLock<Dispatcher>,
    // Held for the whole reduce-swap-notify sequence. Reentrant so that a
    // listener may dispatch; the flag marks that a reducer is running.
    dispatch_lock: ReentrantMutex<Cell<bool>>,
    subscribers: Arc<SubscriberSet<S>>,
    disposed: AtomicBool,
    instrument: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    dispose_hooks: Mutex<Vec<DisposeHook>>,
}

/// The single owner of an application state.
///
/// All state changes go through [`Store::dispatch`]: the reducer computes the
/// next state, the state is swapped, then every subscriber whose selection
/// changed is notified, synchronously and in registration order.
///
/// Dispatching from several threads is allowed and serialized. A listener may
/// dispatch; the nested dispatch completes, notifications included, before
/// the outer one notifies its remaining listeners. A reducer may not dispatch.
pub struct Store<S: State> {
    inner: Arc<StoreInner<S>>,
}

impl<S: State> Clone for Store<S> {
    fn clone(&self) -> Self {
        Store {
            inner: self.inner.clone(),
        }
    }
}

/// A non-owning handle to a store, used by middleware to avoid reference cycles.
pub struct WeakStore<S: State> {
    inner: Weak<StoreInner<S>>,
}

impl<S: State> Clone for WeakStore<S> {
    fn clone(&self) -> Self {
        WeakStore {
            inner: self.inner.clone(),
        }
    }
}

impl<S: State> WeakStore<S> {
    pub fn upgrade(&self) -> Option<Store<S>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }

    /// Dispatches through the full dispatcher of the store, if it is still alive.
    pub fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        match self.upgrade() {
            Some(store) => store.dispatch(action),
            None => Err(StoreError::Disposed),
        }
    }
}

impl<S: State> StoreInner<S> {
    fn reduce_and_notify(&self, action: Action) -> Result<(), StoreError> {
        action.validate()?;
        if self.disposed.load(Ordering::Acquire) {
            return Err(StoreError::Disposed);
        }
        let reducing = self.dispatch_lock.lock();
        if reducing.get() {
            return Err(StoreError::DispatchWhileReducing);
        }
        reducing.set(true);
        {
            scopeguard::defer! { reducing.set(false) }
            let next = (self.reducer)(self.state.get_cloned(), &action);
            self.state.set(next);
        }
        tracing::trace!(action = action.kind(), "state swapped");
        self.subscribers.notify_all(|| self.state.get_cloned());
        Ok(())
    }
}

impl<S: State> Store<S> {
    pub fn new(reducer: Reducer<S>, initial_state: S) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner<S>>| {
            let weak = weak.clone();
            let dispatcher: Dispatcher = Arc::new(move |action: Action| match weak.upgrade() {
                Some(inner) => inner.reduce_and_notify(action),
                None => Err(StoreError::Disposed),
            });
            StoreInner {
                state: Mutable::new(initial_state),
                reducer,
                dispatcher: RwLock::new(dispatcher),
                dispatch_lock: ReentrantMutex::new(Cell::new(false)),
                subscribers: SubscriberSet::new(),
                disposed: AtomicBool::new(false),
                instrument: RwLock::new(None),
                dispose_hooks: Mutex::new(Vec::new()),
            }
        });
        Store { inner }
    }

    /// Returns a snapshot of the current state.
    pub fn get_state(&self) -> S {
        self.inner.state.get_cloned()
    }

    pub fn to_signal(&self) -> MutableSignalCloned<S> {
        self.inner.state.signal_cloned()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<S>> {
        self.inner.state.signal_cloned().to_stream()
    }

    pub fn reducer(&self) -> Reducer<S> {
        self.inner.reducer.clone()
    }

    pub fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        action.validate()?;
        let dispatcher = self.inner.dispatcher.read().clone();
        dispatcher(action)
    }

    /// Dispatches an action of the given type without payload.
    pub fn dispatch_type(&self, kind: &str) -> Result<(), StoreError> {
        if kind.is_empty() {
            return Err(StoreError::empty("action_type"));
        }
        self.dispatch(Action::new(kind.to_string()))
    }

    pub fn dispatch_payload<P: AnyValue>(&self, kind: &str, payload: P) -> Result<(), StoreError> {
        if kind.is_empty() {
            return Err(StoreError::empty("action_type"));
        }
        self.dispatch(Action::with_payload(kind.to_string(), payload))
    }

    pub fn dispatch_creator<P>(&self, creator: &ActionCreator<P>) -> Result<(), StoreError> {
        self.dispatch(creator.create())
    }

    pub fn dispatch_creator_with<P: AnyValue>(
        &self,
        creator: &ActionCreator<P>,
        payload: P,
    ) -> Result<(), StoreError> {
        self.dispatch(creator.create_with(payload))
    }

    /// The dispatcher currently installed on the store.
    pub fn dispatcher(&self) -> Dispatcher {
        self.inner.dispatcher.read().clone()
    }

    pub fn set_dispatcher(&self, dispatcher: Dispatcher) {
        *self.inner.dispatcher.write() = dispatcher;
    }

    /// Subscribes to a projection of the state.
    ///
    /// The listener only runs when the selected value differs from the last
    /// one it was given.
    pub fn subscribe<T, F, L>(&self, selector: F, listener: L, options: SubscribeOptions<T>) -> Subscription
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&S) -> T + Send + Sync + 'static,
        L: Fn(&T) + Send + Sync + 'static,
    {
        if self.is_disposed() {
            tracing::warn!("subscribing to a disposed store, the listener will never be called");
            return Subscription::detached();
        }
        self.inner
            .subscribers
            .add(&self.get_state(), selector, listener, options)
    }

    /// Subscribes to the whole state.
    pub fn subscribe_state<L>(&self, listener: L, options: SubscribeOptions<S>) -> Subscription
    where
        S: PartialEq,
        L: Fn(&S) + Send + Sync + 'static,
    {
        self.subscribe(|state: &S| state.clone(), listener, options)
    }

    /// Removes a subscription made on this store. Returns whether it was present.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        subscription.belongs_to(&self.inner.subscribers) && subscription.unsubscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Runs every subscriber against the current state.
    pub fn notify_subscribers(&self) {
        let inner = &self.inner;
        inner.subscribers.notify_all(|| inner.state.get_cloned());
    }

    pub fn downgrade(&self) -> WeakStore<S> {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Detaches every subscriber and rejects further dispatches.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let detached = self.inner.subscribers.clear();
        let hooks = std::mem::take(&mut *self.inner.dispose_hooks.lock());
        for hook in hooks {
            hook();
        }
        let late = self.inner.subscribers.clear();
        if late > 0 {
            tracing::warn!(
                late,
                "The Store still had active subscriptions. You should not subscribe to the store when it is being disposed."
            );
        }
        tracing::debug!(detached, "store disposed");
    }

    pub(crate) fn on_dispose(&self, hook: impl FnOnce() + Send + 'static) {
        self.inner.dispose_hooks.lock().push(Box::new(hook));
    }

    pub(crate) fn attach_instrument(&self, instrument: Arc<dyn Any + Send + Sync>) {
        *self.inner.instrument.write() = Some(instrument);
    }

    pub(crate) fn instrument(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.inner.instrument.read().clone()
    }

    pub(crate) fn ptr_eq(&self, other: &Store<S>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Store<PartitionedState> {
    /// Returns a clone of the state of the slice named `slice_name`.
    pub fn get_slice_state<T: AnyValue + Clone>(&self, slice_name: &str) -> Result<T, StoreError> {
        self.inner.state.lock_ref().get::<T>(slice_name).cloned()
    }
}

impl<S: State> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("subscribers", &self.subscriber_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
