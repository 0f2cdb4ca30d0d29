use std::any::Any;
use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

/// A value that can travel inside an action or a partitioned state.
///
/// Implemented for every `Clone + PartialEq + Debug + Send + Sync + 'static`
/// type, so payloads, thunk metadata and slice states never need a manual impl.
pub trait AnyValue: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn eq_value(&self, other: &dyn AnyValue) -> bool;
    fn type_name(&self) -> &'static str;
}

impl<T> AnyValue for T
where
    T: Any + Clone + PartialEq + Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn AnyValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Action type strings reserved by the store.
pub mod action_types {
    /// Dispatched once by the store factory right after a store is created.
    pub const INIT: &str = "@@redux/INIT";
    /// Dispatched when the root reducer of a store is replaced.
    pub const REPLACE: &str = "@@redux/REPLACE";
}

/// An action envelope: a non-empty type string, an optional payload and
/// optional metadata.
///
/// Two actions are equal when their types and payloads are equal.
#[derive(Clone)]
pub struct Action {
    kind: Cow<'static, str>,
    payload: Option<Arc<dyn AnyValue>>,
    meta: Option<Arc<dyn AnyValue>>,
}

impl Action {
    pub fn new(kind: impl Into<Cow<'static, str>>) -> Self {
        Action {
            kind: kind.into(),
            payload: None,
            meta: None,
        }
    }

    pub fn with_payload<P: AnyValue>(kind: impl Into<Cow<'static, str>>, payload: P) -> Self {
        Action {
            kind: kind.into(),
            payload: Some(Arc::new(payload)),
            meta: None,
        }
    }

    /// Attaches metadata, replacing any previous value.
    pub fn with_meta<M: AnyValue>(mut self, meta: M) -> Self {
        self.meta = Some(Arc::new(meta));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Returns the payload if it is present and of type `P`.
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload
            .as_deref()
            .and_then(|payload| payload.as_any().downcast_ref::<P>())
    }

    /// Returns the metadata if it is present and of type `M`.
    pub fn meta<M: Any>(&self) -> Option<&M> {
        self.meta
            .as_deref()
            .and_then(|meta| meta.as_any().downcast_ref::<M>())
    }

    pub(crate) fn validate(&self) -> Result<(), crate::StoreError> {
        if self.kind.is_empty() {
            return Err(crate::StoreError::empty("action.type"));
        }
        Ok(())
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && match (&self.payload, &other.payload) {
                (None, None) => true,
                (Some(a), Some(b)) => a.eq_value(b.as_ref()),
                _ => false,
            }
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Action");
        debug.field("type", &self.kind);
        if let Some(payload) = &self.payload {
            debug.field("payload", payload);
        }
        if let Some(meta) = &self.meta {
            debug.field("meta", meta);
        }
        debug.finish()
    }
}

/// Builds and recognises actions of one fixed type.
///
/// Creators carry no mutable state, so they are usually declared as constants:
///
/// ```
/// use reduxrx::ActionCreator;
///
/// const INCREMENT: ActionCreator = ActionCreator::new("counter/increment");
/// const INCREMENT_BY: ActionCreator<i32> = ActionCreator::new("counter/incrementBy");
///
/// assert!(INCREMENT.matches(&INCREMENT.create()));
/// assert_eq!(INCREMENT_BY.create_with(5).payload::<i32>(), Some(&5));
/// ```
pub struct ActionCreator<P = ()> {
    kind: Cow<'static, str>,
    _payload: PhantomData<fn(P)>,
}

impl<P> ActionCreator<P> {
    pub const fn new(kind: &'static str) -> Self {
        ActionCreator {
            kind: Cow::Borrowed(kind),
            _payload: PhantomData,
        }
    }

    /// Creates a creator for a type computed at runtime.
    pub fn from_type(kind: impl Into<String>) -> Self {
        ActionCreator {
            kind: Cow::Owned(kind.into()),
            _payload: PhantomData,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// True when the action has exactly this creator's type.
    pub fn matches(&self, action: &Action) -> bool {
        action.kind() == self.kind
    }

    /// Builds an action without payload.
    pub fn create(&self) -> Action {
        Action::new(self.kind.clone())
    }

    /// Returns the untyped creator for the same action type.
    pub fn erase(&self) -> ActionCreator {
        ActionCreator {
            kind: self.kind.clone(),
            _payload: PhantomData,
        }
    }
}

impl<P: AnyValue> ActionCreator<P> {
    pub fn create_with(&self, payload: P) -> Action {
        Action::with_payload(self.kind.clone(), payload)
    }
}

impl<P> Clone for ActionCreator<P> {
    fn clone(&self) -> Self {
        ActionCreator {
            kind: self.kind.clone(),
            _payload: PhantomData,
        }
    }
}

impl<P> PartialEq for ActionCreator<P> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl<P> Eq for ActionCreator<P> {}

impl<P> Debug for ActionCreator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionCreator").field(&self.kind).finish()
    }
}

impl<P> From<&'static str> for ActionCreator<P> {
    fn from(kind: &'static str) -> Self {
        ActionCreator::new(kind)
    }
}

impl<P> From<String> for ActionCreator<P> {
    fn from(kind: String) -> Self {
        ActionCreator::from_type(kind)
    }
}
