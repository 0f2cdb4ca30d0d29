use super::{
    diff_states, lift_reducer_with, DevToolsAction, DevToolsConfiguration, DevToolsRegistry,
    HistoryEntry, InspectableStore, LiftedState, StateDiff,
};
use crate::subscription::SubscriberSet;
use crate::{
    Action, Reducer, State, Store, StoreCreator, StoreEnhancer, StoreError, SubscribeOptions,
    Subscription, WeakStore,
};
use parking_lot::Mutex;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// The time-travel layer attached to one store.
pub(crate) struct Instrumentation<S: State> {
    id: String,
    display_name: String,
    lifted: Mutex<Arc<LiftedState<S>>>,
    lifted_reducer: Reducer<LiftedState<S>>,
    subscribers: Arc<SubscriberSet<Arc<LiftedState<S>>>>,
    store: OnceLock<WeakStore<S>>,
}

fn short_type_name<S>() -> &'static str {
    let name = std::any::type_name::<S>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

impl<S: State + PartialEq + Debug> Instrumentation<S> {
    fn new(reducer: Reducer<S>, initial_state: S, config: &DevToolsConfiguration) -> Self {
        let display_name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("Store for {}", short_type_name::<S>()));
        Instrumentation {
            id: uuid::Uuid::new_v4().to_string(),
            display_name,
            lifted: Mutex::new(Arc::new(LiftedState::new(initial_state.clone(), config))),
            lifted_reducer: lift_reducer_with(reducer, initial_state, config),
            subscribers: SubscriberSet::new(),
            store: OnceLock::new(),
        }
    }

    /// The reducer installed on the store: it runs the lifted reducer and
    /// exposes the state at the current index.
    fn unlifted_reducer(self: &Arc<Self>) -> Reducer<S> {
        let this = self.clone();
        Arc::new(move |state: S, action: &Action| this.reduce(state, action))
    }

    fn reduce(&self, state: S, action: &Action) -> S {
        let lifted_action = DevToolsAction::lift(action);
        let next = {
            let mut lifted = self.lifted.lock();
            let next = Arc::new((self.lifted_reducer)((**lifted).clone(), &lifted_action));
            *lifted = next.clone();
            next
        };
        self.subscribers.notify_all(|| self.lifted_state());
        next.current_state().cloned().unwrap_or(state)
    }

    fn lifted_state(&self) -> Arc<LiftedState<S>> {
        self.lifted.lock().clone()
    }

    fn store(&self) -> Option<Store<S>> {
        self.store.get().and_then(WeakStore::upgrade)
    }
}

impl<S: State + PartialEq + Debug> InspectableStore for Instrumentation<S> {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn perform(&self, command: DevToolsAction) -> Result<(), StoreError> {
        match self.store() {
            Some(store) => store.dispatch(command.into_action()),
            None => Err(StoreError::Disposed),
        }
    }

    fn history(&self) -> Vec<HistoryEntry> {
        let lifted = self.lifted_state();
        lifted
            .staged_action_ids
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let recorded = lifted.actions_by_id.get(id)?;
                Some(HistoryEntry {
                    action_id: *id,
                    kind: recorded.action.kind().to_string(),
                    timestamp: recorded.timestamp,
                    skipped: lifted.is_skipped(*id),
                    current: lifted.current_state_index == Some(index),
                })
            })
            .collect()
    }

    fn current_state_debug(&self) -> Option<String> {
        self.lifted_state()
            .current_state()
            .map(|state| format!("{:#?}", state))
    }
}

/// Store enhancer recording every action for time travel.
///
/// The enhanced store keeps a [`LiftedState`] next to its state; the state it
/// exposes is the one at the current history index. Use
/// [`Store::instrumented`] to reach the history and the DevTools commands.
pub struct Instrument<S>(PhantomData<fn() -> S>);

impl<S: State + PartialEq + Debug> Instrument<S> {
    /// Instruments every store created through the enhancer, whatever
    /// `config.enabled` says.
    pub fn enhancer(config: DevToolsConfiguration) -> StoreEnhancer<S> {
        Self::build(config, None)
    }

    /// Like [`Instrument::enhancer`], and connects each store to `registry`
    /// until it is disposed.
    pub fn enhancer_with_registry(
        config: DevToolsConfiguration,
        registry: DevToolsRegistry,
    ) -> StoreEnhancer<S> {
        Self::build(config, Some(registry))
    }

    fn build(config: DevToolsConfiguration, registry: Option<DevToolsRegistry>) -> StoreEnhancer<S> {
        Arc::new(move |creator: StoreCreator<S>| -> StoreCreator<S> {
            let config = config.clone();
            let registry = registry.clone();
            Arc::new(move |reducer: Reducer<S>, initial_state: S| {
                let instrumentation = Arc::new(Instrumentation::new(reducer, initial_state.clone(), &config));
                let store = creator(instrumentation.unlifted_reducer(), initial_state);
                let _ = instrumentation.store.set(store.downgrade());
                store.attach_instrument(instrumentation.clone());
                tracing::debug!(
                    id = %instrumentation.id,
                    name = %instrumentation.display_name,
                    "store instrumented"
                );
                if let Some(registry) = &registry {
                    registry.connect(instrumentation.clone());
                    let registry = registry.clone();
                    let id = instrumentation.id.clone();
                    store.on_dispose(move || {
                        registry.disconnect(&id);
                    });
                }
                store
            })
        })
    }
}

/// A store enhanced by [`Instrument`], with access to its history.
///
/// Derefs to the plain [`Store`].
pub struct InstrumentedStore<S: State> {
    store: Store<S>,
    instrumentation: Arc<Instrumentation<S>>,
}

impl<S: State> Clone for InstrumentedStore<S> {
    fn clone(&self) -> Self {
        InstrumentedStore {
            store: self.store.clone(),
            instrumentation: self.instrumentation.clone(),
        }
    }
}

impl<S: State> Deref for InstrumentedStore<S> {
    type Target = Store<S>;

    fn deref(&self) -> &Store<S> {
        &self.store
    }
}

impl<S: State + PartialEq + Debug> InstrumentedStore<S> {
    pub fn id(&self) -> &str {
        &self.instrumentation.id
    }

    pub fn display_name(&self) -> &str {
        &self.instrumentation.display_name
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    /// A snapshot of the history.
    pub fn get_lifted_state(&self) -> Arc<LiftedState<S>> {
        self.instrumentation.lifted_state()
    }

    /// Subscribes to a projection of the history.
    ///
    /// Listeners run while the store reduces and must not dispatch
    /// synchronously.
    pub fn subscribe_lifted<T, F, L>(
        &self,
        selector: F,
        listener: L,
        options: SubscribeOptions<T>,
    ) -> Subscription
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&Arc<LiftedState<S>>) -> T + Send + Sync + 'static,
        L: Fn(&T) + Send + Sync + 'static,
    {
        self.instrumentation.subscribers.add(
            &self.instrumentation.lifted_state(),
            selector,
            listener,
            options,
        )
    }

    /// Called after every reduction of the history.
    pub fn subscribe_lifted_state<L>(&self, listener: L) -> Subscription
    where
        L: Fn(&Arc<LiftedState<S>>) + Send + Sync + 'static,
    {
        self.subscribe_lifted(
            |lifted: &Arc<LiftedState<S>>| lifted.clone(),
            listener,
            SubscribeOptions::default()
                .with_comparer(|a: &Arc<LiftedState<S>>, b: &Arc<LiftedState<S>>| Arc::ptr_eq(a, b)),
        )
    }

    /// Diff between the state before and after the staged action at `index`.
    pub fn diff_at(&self, index: usize) -> Option<StateDiff> {
        let lifted = self.get_lifted_state();
        let after = &lifted.computed_states.get(index)?.state;
        let before = match index.checked_sub(1) {
            Some(previous) => &lifted.computed_states.get(previous)?.state,
            None => &lifted.committed_state,
        };
        Some(diff_states(before, after))
    }

    pub fn perform(&self, command: DevToolsAction) -> Result<(), StoreError> {
        self.store.dispatch(command.into_action())
    }

    pub fn commit(&self) -> Result<(), StoreError> {
        self.perform(DevToolsAction::Commit)
    }

    pub fn rollback(&self) -> Result<(), StoreError> {
        self.perform(DevToolsAction::Rollback)
    }

    pub fn reset(&self) -> Result<(), StoreError> {
        self.perform(DevToolsAction::Reset)
    }

    pub fn sweep(&self) -> Result<(), StoreError> {
        self.perform(DevToolsAction::Sweep)
    }

    /// Skips the action if it is active, includes it again otherwise.
    pub fn toggle_action(&self, action_id: usize) -> Result<(), StoreError> {
        let active = self.get_lifted_state().is_skipped(action_id);
        self.toggle_range(action_id, action_id, active)
    }

    pub fn toggle_range(&self, start: usize, end: usize, active: bool) -> Result<(), StoreError> {
        self.perform(DevToolsAction::Toggle { start, end, active })
    }

    pub fn jump_to_state(&self, index: usize) -> Result<(), StoreError> {
        self.perform(DevToolsAction::JumpToState(index))
    }

    pub fn jump_to_action(&self, action_id: usize) -> Result<(), StoreError> {
        self.perform(DevToolsAction::JumpToAction(action_id))
    }

    pub fn lock_changes(&self, locked: bool) -> Result<(), StoreError> {
        self.perform(DevToolsAction::LockChanges(locked))
    }

    pub fn pause_recording(&self, paused: bool) -> Result<(), StoreError> {
        self.perform(DevToolsAction::PauseRecording(paused))
    }
}

impl<S: State + PartialEq + Debug> Store<S> {
    /// The time-travel view of a store created with [`Instrument`].
    pub fn instrumented(&self) -> Result<InstrumentedStore<S>, StoreError> {
        let instrumentation = self
            .instrument()
            .and_then(|instrument| instrument.downcast::<Instrumentation<S>>().ok())
            .ok_or(StoreError::NotInstrumented)?;
        Ok(InstrumentedStore {
            store: self.clone(),
            instrumentation,
        })
    }
}

impl<S: State> Debug for InstrumentedStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedStore")
            .field("id", &self.instrumentation.id)
            .field("display_name", &self.instrumentation.display_name)
            .field("store", &self.store)
            .finish()
    }
}
