use crate::devtools::{DevToolsConfiguration, DevToolsRegistry, Instrument};
use crate::thunk::thunk_middleware;
use crate::{
    action_types, Action, Dispatcher, PartitionedState, Reducer, SliceReducer, State, Store,
    StoreError, WeakStore,
};
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Creates a store from a reducer and an initial state.
pub type StoreCreator<S> = Arc<dyn Fn(Reducer<S>, S) -> Store<S> + Send + Sync>;

/// Wraps a store creator to add behavior to the stores it creates.
pub type StoreEnhancer<S> = Arc<dyn Fn(StoreCreator<S>) -> StoreCreator<S> + Send + Sync>;

/// Wraps the next dispatcher of the chain.
///
/// The store handle is weak; dispatching through it restarts the whole chain.
pub type Middleware<S> = Arc<dyn Fn(WeakStore<S>, Dispatcher) -> Dispatcher + Send + Sync>;

fn base_store_creator<S: State>() -> StoreCreator<S> {
    Arc::new(|reducer: Reducer<S>, initial_state: S| Store::new(reducer, initial_state))
}

/// Creates a store, optionally enhanced, and dispatches
/// [`action_types::INIT`] to it.
pub fn create_store<S: State>(
    reducer: Reducer<S>,
    initial_state: S,
    enhancer: Option<StoreEnhancer<S>>,
) -> Result<Store<S>, StoreError> {
    let creator = match enhancer {
        Some(enhancer) => enhancer(base_store_creator()),
        None => base_store_creator(),
    };
    let store = creator(reducer, initial_state);
    store.dispatch(Action::new(action_types::INIT))?;
    tracing::debug!(state = std::any::type_name::<S>(), "store created");
    Ok(store)
}

/// Creates a store whose root state holds one partition per slice.
///
/// Every dispatched action runs through the reducers of all slices, in the
/// order they are given.
pub fn create_store_from_slices(
    slices: impl IntoIterator<Item = Arc<dyn SliceReducer>>,
    enhancer: Option<StoreEnhancer<PartitionedState>>,
) -> Result<Store<PartitionedState>, StoreError> {
    let slices: Vec<Arc<dyn SliceReducer>> = slices.into_iter().collect();
    let mut names = HashSet::new();
    for slice in &slices {
        if !names.insert(slice.name().to_string()) {
            return Err(StoreError::DuplicateSlice(slice.name().to_string()));
        }
    }
    let initial_state = slices
        .iter()
        .fold(PartitionedState::new(), |root, slice| slice.seed(root));
    let reducer: Reducer<PartitionedState> = Arc::new(move |root: PartitionedState, action: &Action| {
        slices
            .iter()
            .fold(root, |root, slice| slice.reduce(root, action))
    });
    create_store(reducer, initial_state, enhancer)
}

/// Composes enhancers so that the last one wraps closest to the base creator:
/// `compose_enhancers(vec![a, b, c])` behaves like `a(b(c(base)))`.
pub fn compose_enhancers<S: State>(enhancers: Vec<StoreEnhancer<S>>) -> StoreEnhancer<S> {
    Arc::new(move |creator: StoreCreator<S>| {
        enhancers
            .iter()
            .rev()
            .fold(creator, |creator, enhancer| enhancer(creator))
    })
}

/// Installs a middleware chain on every store created through the enhancer.
///
/// The first middleware sees each action first; the last one hands it to the
/// dispatcher the store had before.
pub fn apply_middleware<S: State>(middlewares: Vec<Middleware<S>>) -> StoreEnhancer<S> {
    let middlewares = Arc::new(middlewares);
    Arc::new(move |creator: StoreCreator<S>| -> StoreCreator<S> {
        let middlewares = middlewares.clone();
        Arc::new(move |reducer: Reducer<S>, initial_state: S| {
            let store = creator(reducer, initial_state);
            let api = store.downgrade();
            let dispatcher = middlewares
                .iter()
                .rev()
                .fold(store.dispatcher(), |next, middleware| {
                    middleware(api.clone(), next)
                });
            store.set_dispatcher(dispatcher);
            store
        })
    })
}

/// Options of [`default_enhancer`].
#[derive(Clone, Debug, Default)]
pub struct DefaultEnhancerConfiguration {
    pub dev_tools: DevToolsConfiguration,
    /// Registry the instrumented store connects to, if any.
    pub registry: Option<DevToolsRegistry>,
}

impl DefaultEnhancerConfiguration {
    pub fn with_dev_tools(mut self, dev_tools: DevToolsConfiguration) -> Self {
        self.dev_tools = dev_tools;
        self
    }

    pub fn with_registry(mut self, registry: DevToolsRegistry) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// The thunk middleware, plus the DevTools instrumentation when enabled.
pub fn default_enhancer<S>(configuration: DefaultEnhancerConfiguration) -> StoreEnhancer<S>
where
    S: State + PartialEq + Debug,
{
    let mut enhancers = vec![apply_middleware(vec![thunk_middleware()])];
    if configuration.dev_tools.enabled {
        enhancers.push(match configuration.registry {
            Some(registry) => Instrument::enhancer_with_registry(configuration.dev_tools, registry),
            None => Instrument::enhancer(configuration.dev_tools),
        });
    }
    compose_enhancers(enhancers)
}
