use crate::ThunkError;
use futures_core::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Decides synchronously whether a thunk may start.
pub type Condition<A, S> = Arc<dyn Fn(&A, &S) -> Result<bool, ThunkError> + Send + Sync>;

/// Decides asynchronously whether a thunk may start.
pub type AsyncCondition<A, S> =
    Arc<dyn Fn(A, S) -> BoxFuture<'static, Result<bool, ThunkError>> + Send + Sync>;

/// Produces the request id of an invocation.
pub type IdGenerator<A> = Arc<dyn Fn(&A) -> String + Send + Sync>;

/// Options of [`create_async_thunk_with`](crate::create_async_thunk_with).
///
/// When both conditions are set the synchronous one runs first and the
/// asynchronous one only if it passed.
pub struct AsyncThunkOptions<A, S> {
    pub condition: Option<Condition<A, S>>,
    pub condition_async: Option<AsyncCondition<A, S>>,
    /// Dispatch a `rejected` action when the condition returns false.
    pub dispatch_condition_rejection: bool,
    /// Defaults to a random UUID v4.
    pub id_generator: Option<IdGenerator<A>>,
}

impl<A, S> Default for AsyncThunkOptions<A, S> {
    fn default() -> Self {
        AsyncThunkOptions {
            condition: None,
            condition_async: None,
            dispatch_condition_rejection: false,
            id_generator: None,
        }
    }
}

impl<A, S> Clone for AsyncThunkOptions<A, S> {
    fn clone(&self) -> Self {
        AsyncThunkOptions {
            condition: self.condition.clone(),
            condition_async: self.condition_async.clone(),
            dispatch_condition_rejection: self.dispatch_condition_rejection,
            id_generator: self.id_generator.clone(),
        }
    }
}

impl<A, S> AsyncThunkOptions<A, S> {
    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&A, &S) -> Result<bool, ThunkError> + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn with_async_condition<F, Fut>(mut self, condition: F) -> Self
    where
        A: 'static,
        S: 'static,
        F: Fn(A, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, ThunkError>> + Send + 'static,
    {
        self.condition_async = Some(Arc::new(move |arg: A, state: S| {
            Box::pin(condition(arg, state)) as BoxFuture<'static, Result<bool, ThunkError>>
        }));
        self
    }

    pub fn dispatch_condition_rejection(mut self, dispatch: bool) -> Self {
        self.dispatch_condition_rejection = dispatch;
        self
    }

    pub fn with_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&A) -> String + Send + Sync + 'static,
    {
        self.id_generator = Some(Arc::new(generator));
        self
    }
}
