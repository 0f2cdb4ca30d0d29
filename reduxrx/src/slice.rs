use crate::{
    Action, ActionCreator, AnyValue, PartitionableState, PartitionedState, Reducer,
    ReducerBuilder, SliceReducerBuilder, StoreError,
};
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A named piece of a [`PartitionedState`] with its own reducer and action creators.
///
/// Slices are built once with [`create_slice`] and never change afterwards.
pub struct Slice<S> {
    name: String,
    initial_state: S,
    reducer: Reducer<S>,
    action_creators: BTreeMap<String, ActionCreator>,
}

impl<S: Clone> Clone for Slice<S> {
    fn clone(&self) -> Self {
        Slice {
            name: self.name.clone(),
            initial_state: self.initial_state.clone(),
            reducer: self.reducer.clone(),
            action_creators: self.action_creators.clone(),
        }
    }
}

impl<S: Debug> Debug for Slice<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slice")
            .field("name", &self.name)
            .field("initial_state", &self.initial_state)
            .field("action_creators", &self.action_creators.keys())
            .finish()
    }
}

impl<S: AnyValue + Clone> Slice<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_state(&self) -> &S {
        &self.initial_state
    }

    /// The reducer of the slice state alone.
    pub fn reducer(&self) -> Reducer<S> {
        self.reducer.clone()
    }

    /// The creators of the actions owned by the slice, keyed by action type.
    pub fn action_creators(&self) -> &BTreeMap<String, ActionCreator> {
        &self.action_creators
    }

    /// Looks up a creator by its short name (`"increment"`) or full type
    /// (`"counter/increment"`).
    pub fn action_creator(&self, name: &str) -> Option<&ActionCreator> {
        self.action_creators
            .get(name)
            .or_else(|| self.action_creators.get(&format!("{}/{}", self.name, name)))
    }

    /// Erases the slice state type so slices of different states can be
    /// passed together to [`create_store_from_slices`](crate::create_store_from_slices).
    pub fn into_dyn(self) -> Arc<dyn SliceReducer> {
        Arc::new(self)
    }
}

/// A slice seen through the root [`PartitionedState`].
pub trait SliceReducer: Send + Sync {
    fn name(&self) -> &str;

    /// Adds the initial slice state to `root` if it is missing.
    fn seed(&self, root: PartitionedState) -> PartitionedState;

    /// Runs the slice reducer on its part of `root`.
    fn reduce(&self, root: PartitionedState, action: &Action) -> PartitionedState;
}

impl<S: AnyValue + Clone> SliceReducer for Slice<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn seed(&self, root: PartitionedState) -> PartitionedState {
        if root.contains(&self.name) {
            return root;
        }
        match root.set(&self.name, self.initial_state.clone()) {
            Ok(next) => next,
            Err(error) => {
                tracing::error!(slice = %self.name, %error, "cannot seed slice state");
                root
            }
        }
    }

    fn reduce(&self, root: PartitionedState, action: &Action) -> PartitionedState {
        let current = match root.get::<S>(&self.name) {
            Ok(state) => state.clone(),
            Err(StoreError::SliceNotFound(_)) => self.initial_state.clone(),
            Err(error) => {
                tracing::error!(slice = %self.name, %error, "slice state skipped");
                return root;
            }
        };
        let next = (self.reducer)(current.clone(), action);
        if next.eq_value(&current) && root.contains(&self.name) {
            return root;
        }
        match root.set(&self.name, next) {
            Ok(next) => next,
            Err(error) => {
                tracing::error!(slice = %self.name, %error, "cannot store slice state");
                root
            }
        }
    }
}

/// Creates a slice named `name`.
///
/// `reducers` registers the cases owned by the slice. Their action types must
/// start with `"<name>/"` and be unique, otherwise an error is returned.
pub fn create_slice<S, F>(name: &str, initial_state: S, reducers: F) -> Result<Slice<S>, StoreError>
where
    S: AnyValue + Clone,
    F: FnOnce(&mut SliceReducerBuilder<S>),
{
    create_slice_with_extra(name, initial_state, reducers, |_| {})
}

/// Creates a slice that also reacts to actions it does not own, such as the
/// lifecycle actions of an async thunk.
pub fn create_slice_with_extra<S, F, E>(
    name: &str,
    initial_state: S,
    reducers: F,
    extra_reducers: E,
) -> Result<Slice<S>, StoreError>
where
    S: AnyValue + Clone,
    F: FnOnce(&mut SliceReducerBuilder<S>),
    E: FnOnce(&mut ReducerBuilder<S>),
{
    if name.is_empty() {
        return Err(StoreError::empty("name"));
    }
    let mut builder = SliceReducerBuilder::new(name);
    reducers(&mut builder);
    let (mut cases, creators) = builder.into_parts();

    let mut extra = ReducerBuilder::new();
    extra_reducers(&mut extra);
    cases.append(extra.into_cases());
    cases.take_error()?;

    let reducer = if cases.is_empty() {
        Arc::new(|state: S, _: &Action| state) as Reducer<S>
    } else {
        cases.into_reducer()
    };
    let action_creators = creators
        .into_iter()
        .map(|creator| (creator.kind().to_string(), creator))
        .collect();

    tracing::debug!(slice = name, "slice created");
    Ok(Slice {
        name: name.to_string(),
        initial_state,
        reducer,
        action_creators,
    })
}
