use super::async_thunk::ThunkDispatch;
use crate::{Action, Dispatcher, Middleware, State, StoreError, WeakStore};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Runs the thunks produced by
/// [`AsyncThunkAction::into_action`](crate::AsyncThunkAction::into_action)
/// on the current tokio runtime instead of reducing them. Other actions pass
/// through untouched.
pub fn thunk_middleware<S: State>() -> Middleware<S> {
    Arc::new(|store: WeakStore<S>, next: Dispatcher| -> Dispatcher {
        Arc::new(move |action: Action| {
            let thunk = action
                .payload::<ThunkDispatch<S>>()
                .map(|dispatch| dispatch.0.clone());
            let Some(thunk) = thunk else {
                return next(action);
            };
            let runtime = Handle::try_current().map_err(|_| StoreError::MissingRuntime)?;
            let store = store.upgrade().ok_or(StoreError::Disposed)?;
            tracing::debug!(thunk = thunk.type_prefix(), "thunk dispatched");
            runtime.spawn(thunk.start(store));
            Ok(())
        })
    })
}
