use crate::{Action, ActionCreator, AnyValue, StoreError};
use std::collections::HashSet;
use std::sync::Arc;

/// A pure function computing the next state from the current one and an action.
///
/// Reducers never mutate their input. When nothing changes they may hand the
/// input back untouched.
pub type Reducer<S> = Arc<dyn Fn(S, &Action) -> S + Send + Sync>;

/// A predicate used to match actions whose creators are not known statically.
pub type ActionMatcher = Arc<dyn Fn(&Action) -> bool + Send + Sync>;

/// Wraps a closure into a [`Reducer`].
pub fn reducer<S, F>(f: F) -> Reducer<S>
where
    F: Fn(S, &Action) -> S + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Runs every reducer in order, feeding each one the state produced by the previous.
pub fn combine_reducers<S: 'static>(reducers: Vec<Reducer<S>>) -> Reducer<S> {
    Arc::new(move |state: S, action: &Action| {
        reducers
            .iter()
            .fold(state, |state, reducer| reducer(state, action))
    })
}

enum Matcher {
    Type(String),
    Predicate(ActionMatcher),
    Default,
}

struct Case<S> {
    matcher: Matcher,
    reducer: Reducer<S>,
}

/// The ordered list of cases shared by both builders.
///
/// Matching cases run in registration order, each on the state returned by
/// the previous one. Default cases only run when no other case matched.
pub(crate) struct CaseSet<S> {
    cases: Vec<Case<S>>,
    types: HashSet<String>,
    error: Option<StoreError>,
}

impl<S: 'static> CaseSet<S> {
    fn new() -> Self {
        CaseSet {
            cases: Vec::new(),
            types: HashSet::new(),
            error: None,
        }
    }

    fn fail(&mut self, error: StoreError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push_type(&mut self, kind: &str, reducer: Reducer<S>, unique: bool) {
        if kind.is_empty() {
            self.fail(StoreError::empty("action_creator.type"));
            return;
        }
        if unique && !self.types.insert(kind.to_string()) {
            self.fail(StoreError::DuplicateCase(kind.to_string()));
            return;
        }
        self.cases.push(Case {
            matcher: Matcher::Type(kind.to_string()),
            reducer,
        });
    }

    fn push(&mut self, matcher: Matcher, reducer: Reducer<S>) {
        self.cases.push(Case { matcher, reducer });
    }

    /// Appends the cases of `other` after the existing ones.
    pub(crate) fn append(&mut self, mut other: CaseSet<S>) {
        if let Some(error) = other.error.take() {
            self.fail(error);
        }
        self.cases.append(&mut other.cases);
    }

    pub(crate) fn take_error(&mut self) -> Result<(), StoreError> {
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub(crate) fn into_reducer(self) -> Reducer<S> {
        let cases = self.cases;
        Arc::new(move |state: S, action: &Action| {
            let mut matched = false;
            let mut next = state;
            for case in &cases {
                let hit = match &case.matcher {
                    Matcher::Type(kind) => kind == action.kind(),
                    Matcher::Predicate(predicate) => predicate(action),
                    Matcher::Default => false,
                };
                if hit {
                    matched = true;
                    next = (case.reducer)(next, action);
                }
            }
            if !matched {
                for case in &cases {
                    if let Matcher::Default = case.matcher {
                        next = (case.reducer)(next, action);
                    }
                }
            }
            next
        })
    }
}

fn payload_reducer<S, P, F>(f: F) -> Reducer<S>
where
    S: 'static,
    P: AnyValue,
    F: Fn(S, &P) -> S + Send + Sync + 'static,
{
    Arc::new(move |state: S, action: &Action| match action.payload::<P>() {
        Some(payload) => f(state, payload),
        None => {
            tracing::warn!(action = action.kind(), "action payload missing or of unexpected type");
            state
        }
    })
}

/// Registers the cases owned by a slice.
///
/// Every action type handled here must live in the `"<slice>/"` namespace and
/// can only be registered once; violations surface when the slice is created.
pub struct SliceReducerBuilder<S> {
    name: String,
    cases: CaseSet<S>,
    creators: Vec<ActionCreator>,
}

impl<S: 'static> SliceReducerBuilder<S> {
    pub(crate) fn new(name: &str) -> Self {
        SliceReducerBuilder {
            name: name.to_string(),
            cases: CaseSet::new(),
            creators: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a case for `"<slice>/<short_name>"` and creates its action creator.
    pub fn add<F>(&mut self, short_name: &str, reducer: F) -> &mut Self
    where
        F: Fn(S, &Action) -> S + Send + Sync + 'static,
    {
        if short_name.is_empty() {
            self.cases.fail(StoreError::empty("short_name"));
            return self;
        }
        let creator: ActionCreator = ActionCreator::from_type(format!("{}/{}", self.name, short_name));
        self.add_case(&creator, reducer)
    }

    pub fn add_case<P, F>(&mut self, creator: &ActionCreator<P>, reducer: F) -> &mut Self
    where
        F: Fn(S, &Action) -> S + Send + Sync + 'static,
    {
        let prefix = format!("{}/", self.name);
        if !creator.kind().starts_with(&prefix) {
            self.cases.fail(StoreError::CaseTypeOutsideSlice {
                kind: creator.kind().to_string(),
                slice: self.name.clone(),
            });
            return self;
        }
        let before = self.cases.cases.len();
        self.cases.push_type(creator.kind(), Arc::new(reducer), true);
        if self.cases.cases.len() > before {
            self.creators.push(creator.erase());
        }
        self
    }

    /// Registers a case whose reducer receives the typed payload.
    pub fn add_payload_case<P, F>(&mut self, creator: &ActionCreator<P>, reducer: F) -> &mut Self
    where
        P: AnyValue,
        F: Fn(S, &P) -> S + Send + Sync + 'static,
    {
        let wrapped = payload_reducer(reducer);
        self.add_case(creator, move |state, action| wrapped(state, action))
    }

    pub fn add_default<F>(&mut self, reducer: F) -> &mut Self
    where
        F: Fn(S, &Action) -> S + Send + Sync + 'static,
    {
        self.cases.push(Matcher::Default, Arc::new(reducer));
        self
    }

    pub(crate) fn into_parts(self) -> (CaseSet<S>, Vec<ActionCreator>) {
        (self.cases, self.creators)
    }
}

/// Registers cases reacting to actions the slice does not own, such as the
/// lifecycle actions of an async thunk.
pub struct ReducerBuilder<S> {
    cases: CaseSet<S>,
}

impl<S: 'static> Default for ReducerBuilder<S> {
    fn default() -> Self {
        ReducerBuilder::new()
    }
}

impl<S: 'static> ReducerBuilder<S> {
    pub fn new() -> Self {
        ReducerBuilder {
            cases: CaseSet::new(),
        }
    }

    pub fn add_case<P, F>(&mut self, creator: &ActionCreator<P>, reducer: F) -> &mut Self
    where
        F: Fn(S, &Action) -> S + Send + Sync + 'static,
    {
        self.cases.push_type(creator.kind(), Arc::new(reducer), false);
        self
    }

    pub fn add_payload_case<P, F>(&mut self, creator: &ActionCreator<P>, reducer: F) -> &mut Self
    where
        P: AnyValue,
        F: Fn(S, &P) -> S + Send + Sync + 'static,
    {
        self.cases
            .push_type(creator.kind(), payload_reducer(reducer), false);
        self
    }

    pub fn add_matcher<M, F>(&mut self, matcher: M, reducer: F) -> &mut Self
    where
        M: Fn(&Action) -> bool + Send + Sync + 'static,
        F: Fn(S, &Action) -> S + Send + Sync + 'static,
    {
        self.cases
            .push(Matcher::Predicate(Arc::new(matcher)), Arc::new(reducer));
        self
    }

    pub fn add_default<F>(&mut self, reducer: F) -> &mut Self
    where
        F: Fn(S, &Action) -> S + Send + Sync + 'static,
    {
        self.cases.push(Matcher::Default, Arc::new(reducer));
        self
    }

    /// Finishes the builder, reporting the first registration error.
    pub fn build(mut self) -> Result<Reducer<S>, StoreError> {
        self.cases.take_error()?;
        Ok(self.cases.into_reducer())
    }

    pub(crate) fn into_cases(self) -> CaseSet<S> {
        self.cases
    }
}

/// Builds a standalone reducer from a builder callback.
pub fn create_reducer<S, F>(builder: F) -> Result<Reducer<S>, StoreError>
where
    S: 'static,
    F: FnOnce(&mut ReducerBuilder<S>),
{
    let mut cases = ReducerBuilder::new();
    builder(&mut cases);
    cases.build()
}
