use thiserror::Error;

/// Errors reported by the store, the slice builders and the DevTools layer.
///
/// Argument errors are raised at the call boundary, lookups that miss are
/// reported with their own variants so callers can tell them apart.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum StoreError {
    /// A required argument was empty or otherwise unusable.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// No slice with the given name exists in the partitioned state.
    #[error("Slice with name '{0}' not found.")]
    SliceNotFound(String),

    /// The slice exists but holds a value of another type.
    #[error("Slice '{name}' does not hold a value of type `{expected}`.")]
    SliceTypeMismatch { name: String, expected: &'static str },

    /// Two slices were registered under the same name.
    #[error("State slice '{0}' already exists.")]
    DuplicateSlice(String),

    /// The same action type was registered twice in one slice builder.
    #[error("Action type '{0}' is already handled.")]
    DuplicateCase(String),

    /// A slice case was registered with an action type outside the slice namespace.
    #[error("Action type '{kind}' must start with '{slice}/'.")]
    CaseTypeOutsideSlice { kind: String, slice: String },

    /// A reducer tried to dispatch while the store was reducing.
    #[error("Reducers may not dispatch actions.")]
    DispatchWhileReducing,

    /// The store has been disposed.
    #[error("The store has been disposed.")]
    Disposed,

    /// The store was not created through the DevTools enhancer.
    #[error("Store is not an instrumented store.")]
    NotInstrumented,

    /// The condition of an async thunk failed before the thunk started.
    #[error("thunk condition failed: {0}")]
    ConditionFailed(ThunkError),

    /// An async operation was requested outside of a tokio runtime.
    #[error("no tokio runtime is available to run the thunk")]
    MissingRuntime,
}

impl StoreError {
    pub(crate) fn empty(name: &'static str) -> Self {
        StoreError::InvalidArgument {
            name,
            reason: "cannot be empty".to_string(),
        }
    }

    /// Returns true if this error is a failed lookup rather than a bad argument.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::SliceNotFound(_))
    }

    /// Returns true if this error was raised at an argument check.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StoreError::InvalidArgument { .. })
    }
}

/// Errors attached to rejected async thunk actions.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ThunkError {
    /// The payload creator failed with a message.
    #[error("{0}")]
    Failed(String),

    /// The payload creator returned `None` when a value was expected.
    #[error("Operation returned None!")]
    None,

    /// The token supplied by the caller was cancelled.
    #[error("The operation has been canceled externally.")]
    CanceledExternally,

    /// The thunk aborted itself through its API.
    #[error("The operation was canceled.")]
    Aborted { reason: Option<String> },

    /// The thunk rejected itself with a value.
    #[error("The Thunk was rejected with a value.")]
    RejectedWithValue,

    /// The configured condition returned false.
    #[error("The condition is not met.")]
    ConditionUnmet,

    /// The payload creator panicked.
    #[error("payload creator panicked: {0}")]
    Panicked(String),
}

impl ThunkError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ThunkError::CanceledExternally | ThunkError::Aborted { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ThunkError::Failed(_) | ThunkError::Panicked(_))
    }
}

impl From<String> for ThunkError {
    fn from(message: String) -> Self {
        ThunkError::Failed(message)
    }
}

impl From<&str> for ThunkError {
    fn from(message: &str) -> Self {
        ThunkError::Failed(message.to_string())
    }
}

/// Renders a panic payload captured by `catch_unwind` or a join handle.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
