use super::meta::{FulfilledMeta, PendingMeta, RejectedMeta};
use super::options::AsyncThunkOptions;
use super::payload::PayloadResult;
use crate::error::panic_message;
use crate::{Action, ActionCreator, AnyValue, State, Store, StoreError, ThunkError};
use futures_core::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type PayloadCreator<A, T, S> = Arc<
    dyn Fn(A, ThunkApi<A, T, S>, CancellationToken) -> BoxFuture<'static, Result<T, ThunkError>>
        + Send
        + Sync,
>;

struct ThunkDefinition<A, T, S: State> {
    type_prefix: String,
    pending: ActionCreator,
    fulfilled: ActionCreator<T>,
    rejected: ActionCreator<T>,
    payload_creator: PayloadCreator<A, T, S>,
    options: AsyncThunkOptions<A, S>,
}

/// An asynchronous operation that reports its progress through
/// `"<prefix>/pending"`, `"<prefix>/fulfilled"` and `"<prefix>/rejected"` actions.
///
/// Every invocation dispatches exactly one `pending` action followed by
/// exactly one of `fulfilled` or `rejected`, all sharing the same request id.
/// The only exception is a failed condition, which dispatches nothing or a
/// lone `rejected` action.
pub struct AsyncThunk<A, T, S: State> {
    definition: Arc<ThunkDefinition<A, T, S>>,
}

impl<A, T, S: State> Clone for AsyncThunk<A, T, S> {
    fn clone(&self) -> Self {
        AsyncThunk {
            definition: self.definition.clone(),
        }
    }
}

impl<A, T, S: State> Debug for AsyncThunk<A, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AsyncThunk")
            .field(&self.definition.type_prefix)
            .finish()
    }
}

/// Creates an async thunk with default options.
pub fn create_async_thunk<A, T, S, F, Fut, R>(
    type_prefix: &str,
    payload_creator: F,
) -> Result<AsyncThunk<A, T, S>, StoreError>
where
    A: AnyValue + Clone + PartialEq,
    T: AnyValue + Clone,
    S: State,
    F: Fn(A, ThunkApi<A, T, S>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: PayloadResult<T>,
{
    create_async_thunk_with(type_prefix, payload_creator, AsyncThunkOptions::default())
}

/// Creates an async thunk.
///
/// The payload creator receives the argument, the [`ThunkApi`] and the
/// cancellation token of the invocation. It runs as a tokio task.
pub fn create_async_thunk_with<A, T, S, F, Fut, R>(
    type_prefix: &str,
    payload_creator: F,
    options: AsyncThunkOptions<A, S>,
) -> Result<AsyncThunk<A, T, S>, StoreError>
where
    A: AnyValue + Clone + PartialEq,
    T: AnyValue + Clone,
    S: State,
    F: Fn(A, ThunkApi<A, T, S>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: PayloadResult<T>,
{
    if type_prefix.is_empty() {
        return Err(StoreError::empty("type_prefix"));
    }
    let payload_creator: PayloadCreator<A, T, S> =
        Arc::new(move |arg: A, api: ThunkApi<A, T, S>, token: CancellationToken| {
            let body = payload_creator(arg, api, token);
            Box::pin(async move { body.await.into_payload() })
                as BoxFuture<'static, Result<T, ThunkError>>
        });
    Ok(AsyncThunk {
        definition: Arc::new(ThunkDefinition {
            type_prefix: type_prefix.to_string(),
            pending: ActionCreator::from_type(format!("{}/pending", type_prefix)),
            fulfilled: ActionCreator::from_type(format!("{}/fulfilled", type_prefix)),
            rejected: ActionCreator::from_type(format!("{}/rejected", type_prefix)),
            payload_creator,
            options,
        }),
    })
}

impl<A, T, S> AsyncThunk<A, T, S>
where
    A: AnyValue + Clone + PartialEq,
    T: AnyValue + Clone,
    S: State,
{
    pub fn type_prefix(&self) -> &str {
        &self.definition.type_prefix
    }

    /// Creator of the `pending` action; its meta is a [`PendingMeta`].
    pub fn pending(&self) -> &ActionCreator {
        &self.definition.pending
    }

    /// Creator of the `fulfilled` action; its payload is the result and its
    /// meta a [`FulfilledMeta`].
    pub fn fulfilled(&self) -> &ActionCreator<T> {
        &self.definition.fulfilled
    }

    /// Creator of the `rejected` action; it only has a payload after
    /// [`ThunkApi::reject_with_value`], and its meta is a [`RejectedMeta`].
    pub fn rejected(&self) -> &ActionCreator<T> {
        &self.definition.rejected
    }

    /// Binds the thunk to an argument. Nothing runs until the result is
    /// dispatched.
    pub fn invoke(&self, arg: A) -> AsyncThunkAction<A, T, S> {
        AsyncThunkAction {
            definition: self.definition.clone(),
            arg,
        }
    }
}

/// A thunk bound to its argument, ready to be dispatched.
pub struct AsyncThunkAction<A, T, S: State> {
    definition: Arc<ThunkDefinition<A, T, S>>,
    arg: A,
}

impl<A: Clone, T, S: State> Clone for AsyncThunkAction<A, T, S> {
    fn clone(&self) -> Self {
        AsyncThunkAction {
            definition: self.definition.clone(),
            arg: self.arg.clone(),
        }
    }
}

/// The outcome of one thunk invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum ThunkSettlement<A, T> {
    Fulfilled {
        payload: T,
        meta: FulfilledMeta<A>,
    },
    Rejected {
        /// Only set by [`ThunkApi::reject_with_value`].
        payload: Option<T>,
        meta: RejectedMeta<A>,
    },
    /// The condition returned false and no rejection was requested.
    Skipped,
}

impl<A, T> ThunkSettlement<A, T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, ThunkSettlement::Fulfilled { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ThunkSettlement::Rejected { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ThunkSettlement::Skipped)
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            ThunkSettlement::Fulfilled { payload, .. } => Some(payload),
            ThunkSettlement::Rejected { payload, .. } => payload.as_ref(),
            ThunkSettlement::Skipped => None,
        }
    }

    pub fn rejected_meta(&self) -> Option<&RejectedMeta<A>> {
        match self {
            ThunkSettlement::Rejected { meta, .. } => Some(meta),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ThunkError> {
        self.rejected_meta().and_then(|meta| meta.error.as_ref())
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ThunkSettlement::Fulfilled { meta, .. } => Some(&meta.request_id),
            ThunkSettlement::Rejected { meta, .. } => Some(&meta.request_id),
            ThunkSettlement::Skipped => None,
        }
    }
}

enum Interception<T> {
    Abort(Option<String>),
    Reject(T),
    Fulfill(T),
}

enum Outcome<T> {
    Intercepted(Interception<T>),
    CanceledExternally,
    Completed(Result<Result<T, ThunkError>, JoinError>),
}

/// The API handed to a payload creator.
///
/// `abort`, `reject_with_value` and `fulfill_with_value` settle the thunk
/// immediately and cancel its token. Only the first of these calls counts;
/// later ones, and any made after the thunk settled, are ignored.
pub struct ThunkApi<A, T, S: State> {
    store: Store<S>,
    request_id: String,
    arg: A,
    token: CancellationToken,
    interceptor: Arc<Mutex<Option<oneshot::Sender<Interception<T>>>>>,
}

impl<A: Clone, T, S: State> Clone for ThunkApi<A, T, S> {
    fn clone(&self) -> Self {
        ThunkApi {
            store: self.store.clone(),
            request_id: self.request_id.clone(),
            arg: self.arg.clone(),
            token: self.token.clone(),
            interceptor: self.interceptor.clone(),
        }
    }
}

impl<A, T, S> ThunkApi<A, T, S>
where
    A: AnyValue + Clone + PartialEq,
    T: AnyValue + Clone,
    S: State,
{
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn arg(&self) -> &A {
        &self.arg
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    pub fn get_state(&self) -> S {
        self.store.get_state()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        self.store.dispatch(action)
    }

    pub fn dispatch_type(&self, kind: &str) -> Result<(), StoreError> {
        self.store.dispatch_type(kind)
    }

    pub fn dispatch_payload<P: AnyValue>(&self, kind: &str, payload: P) -> Result<(), StoreError> {
        self.store.dispatch_payload(kind, payload)
    }

    pub fn dispatch_creator<P>(&self, creator: &ActionCreator<P>) -> Result<(), StoreError> {
        self.store.dispatch_creator(creator)
    }

    pub fn dispatch_creator_with<P: AnyValue>(
        &self,
        creator: &ActionCreator<P>,
        payload: P,
    ) -> Result<(), StoreError> {
        self.store.dispatch_creator_with(creator, payload)
    }

    /// Runs another thunk; it is cancelled along with this one.
    pub async fn dispatch_async_thunk<B, U>(
        &self,
        action: AsyncThunkAction<B, U, S>,
    ) -> Result<ThunkSettlement<B, U>, StoreError>
    where
        B: AnyValue + Clone + PartialEq,
        U: AnyValue + Clone,
    {
        self.store
            .dispatch_async_thunk(action, Some(self.token.clone()))
            .await
    }

    /// Rejects the thunk with `aborted = true` and the given reason.
    pub fn abort(&self, reason: Option<&str>) {
        self.intercept(Interception::Abort(reason.map(str::to_string)));
    }

    /// Rejects the thunk with `value` as payload.
    pub fn reject_with_value(&self, value: T) {
        self.intercept(Interception::Reject(value));
    }

    /// Fulfills the thunk with `value` without waiting for the payload creator.
    pub fn fulfill_with_value(&self, value: T) {
        self.intercept(Interception::Fulfill(value));
    }

    fn intercept(&self, interception: Interception<T>) {
        let sender = self.interceptor.lock().take();
        match sender {
            Some(sender) => {
                if sender.send(interception).is_err() {
                    tracing::debug!(request_id = %self.request_id, "thunk already settled");
                }
                self.token.cancel();
            }
            None => tracing::debug!(request_id = %self.request_id, "thunk already settled"),
        }
    }
}

impl<A, T, S> ThunkDefinition<A, T, S>
where
    A: AnyValue + Clone + PartialEq,
    T: AnyValue + Clone,
    S: State,
{
    async fn check_condition(&self, arg: &A, store: &Store<S>) -> Result<bool, StoreError> {
        if let Some(condition) = &self.options.condition {
            if !condition(arg, &store.get_state()).map_err(StoreError::ConditionFailed)? {
                return Ok(false);
            }
        }
        if let Some(condition) = &self.options.condition_async {
            return condition(arg.clone(), store.get_state())
                .await
                .map_err(StoreError::ConditionFailed);
        }
        Ok(true)
    }

    fn settle(&self, request_id: String, arg: A, outcome: Outcome<T>) -> ThunkSettlement<A, T> {
        match outcome {
            Outcome::Intercepted(Interception::Fulfill(payload)) | Outcome::Completed(Ok(Ok(payload))) => {
                ThunkSettlement::Fulfilled {
                    payload,
                    meta: FulfilledMeta { request_id, arg },
                }
            }
            Outcome::Intercepted(Interception::Abort(reason)) => {
                let error = ThunkError::Aborted {
                    reason: reason.clone(),
                };
                ThunkSettlement::Rejected {
                    payload: None,
                    meta: RejectedMeta {
                        aborted: true,
                        reason,
                        ..RejectedMeta::new(request_id, arg, error)
                    },
                }
            }
            Outcome::Intercepted(Interception::Reject(value)) => ThunkSettlement::Rejected {
                payload: Some(value),
                meta: RejectedMeta {
                    rejected_with_value: true,
                    ..RejectedMeta::new(request_id, arg, ThunkError::RejectedWithValue)
                },
            },
            Outcome::CanceledExternally => ThunkSettlement::Rejected {
                payload: None,
                meta: RejectedMeta::new(request_id, arg, ThunkError::CanceledExternally),
            },
            Outcome::Completed(Ok(Err(error))) => ThunkSettlement::Rejected {
                payload: None,
                meta: RejectedMeta::new(request_id, arg, error),
            },
            Outcome::Completed(Err(join_error)) => {
                let error = if join_error.is_panic() {
                    ThunkError::Panicked(panic_message(join_error.into_panic().as_ref()))
                } else {
                    ThunkError::CanceledExternally
                };
                ThunkSettlement::Rejected {
                    payload: None,
                    meta: RejectedMeta::new(request_id, arg, error),
                }
            }
        }
    }

    fn settlement_action(&self, settlement: &ThunkSettlement<A, T>) -> Option<Action> {
        match settlement {
            ThunkSettlement::Fulfilled { payload, meta } => Some(
                self.fulfilled
                    .create_with(payload.clone())
                    .with_meta(meta.clone()),
            ),
            ThunkSettlement::Rejected { payload, meta } => {
                let action = match payload {
                    Some(payload) => self.rejected.create_with(payload.clone()),
                    None => self.rejected.create(),
                };
                Some(action.with_meta(meta.clone()))
            }
            ThunkSettlement::Skipped => None,
        }
    }
}

impl<A, T, S> AsyncThunkAction<A, T, S>
where
    A: AnyValue + Clone + PartialEq,
    T: AnyValue + Clone,
    S: State,
{
    pub fn arg(&self) -> &A {
        &self.arg
    }

    pub fn type_prefix(&self) -> &str {
        &self.definition.type_prefix
    }

    /// Wraps the thunk into a plain action. A store enhanced with
    /// [`thunk_middleware`](crate::thunk_middleware) runs it when dispatched.
    pub fn into_action(self) -> Action {
        let kind = self.definition.type_prefix.clone();
        Action::with_payload(kind, ThunkDispatch::<S>(Arc::new(self)))
    }

    pub(crate) async fn run(
        self,
        store: Store<S>,
        token: Option<CancellationToken>,
    ) -> Result<ThunkSettlement<A, T>, StoreError> {
        let runtime = Handle::try_current().map_err(|_| StoreError::MissingRuntime)?;
        let AsyncThunkAction { definition, arg } = self;
        let request_id = match &definition.options.id_generator {
            Some(generate) => generate(&arg),
            None => Uuid::new_v4().to_string(),
        };

        if !definition.check_condition(&arg, &store).await? {
            if !definition.options.dispatch_condition_rejection {
                tracing::debug!(thunk = %definition.type_prefix, %request_id, "thunk condition not met");
                return Ok(ThunkSettlement::Skipped);
            }
            let settlement = ThunkSettlement::Rejected {
                payload: None,
                meta: RejectedMeta {
                    condition: true,
                    reason: Some(ThunkError::ConditionUnmet.to_string()),
                    ..RejectedMeta::new(request_id, arg, ThunkError::ConditionUnmet)
                },
            };
            if let Some(action) = definition.settlement_action(&settlement) {
                store.dispatch(action)?;
            }
            return Ok(settlement);
        }

        tracing::debug!(thunk = %definition.type_prefix, %request_id, "thunk pending");
        store.dispatch(definition.pending.create().with_meta(PendingMeta {
            request_id: request_id.clone(),
            arg: arg.clone(),
        }))?;

        let external = token.unwrap_or_default();
        let internal = external.child_token();
        let (sender, mut receiver) = oneshot::channel();
        let interceptor = Arc::new(Mutex::new(Some(sender)));

        let outcome = if external.is_cancelled() {
            Outcome::CanceledExternally
        } else {
            let api = ThunkApi {
                store: store.clone(),
                request_id: request_id.clone(),
                arg: arg.clone(),
                token: internal.clone(),
                interceptor: interceptor.clone(),
            };
            let mut body = runtime.spawn((definition.payload_creator)(arg.clone(), api, internal));
            tokio::select! {
                biased;
                Ok(interception) = &mut receiver => Outcome::Intercepted(interception),
                _ = external.cancelled() => Outcome::CanceledExternally,
                joined = &mut body => Outcome::Completed(joined),
            }
        };
        interceptor.lock().take();

        let settlement = definition.settle(request_id, arg, outcome);
        tracing::debug!(
            thunk = %definition.type_prefix,
            request_id = settlement.request_id().unwrap_or_default(),
            fulfilled = settlement.is_fulfilled(),
            "thunk settled"
        );
        if let Some(action) = definition.settlement_action(&settlement) {
            store.dispatch(action)?;
        }
        Ok(settlement)
    }
}

impl<S: State> Store<S> {
    /// Runs an async thunk against this store and waits for it to settle.
    ///
    /// Failures of the payload creator end up in the `rejected` action and in
    /// the returned settlement. `Err` is only returned when the condition
    /// fails, when there is no tokio runtime, or when a lifecycle action
    /// cannot be dispatched.
    pub async fn dispatch_async_thunk<A, T>(
        &self,
        action: AsyncThunkAction<A, T, S>,
        token: Option<CancellationToken>,
    ) -> Result<ThunkSettlement<A, T>, StoreError>
    where
        A: AnyValue + Clone + PartialEq,
        T: AnyValue + Clone,
    {
        action.run(self.clone(), token).await
    }
}

/// A thunk travelling through the middleware chain as an action payload.
pub(crate) trait ErasedThunk<S: State>: Send + Sync {
    fn type_prefix(&self) -> &str;

    fn start(&self, store: Store<S>) -> BoxFuture<'static, ()>;
}

impl<A, T, S> ErasedThunk<S> for AsyncThunkAction<A, T, S>
where
    A: AnyValue + Clone + PartialEq,
    T: AnyValue + Clone,
    S: State,
{
    fn type_prefix(&self) -> &str {
        &self.definition.type_prefix
    }

    fn start(&self, store: Store<S>) -> BoxFuture<'static, ()> {
        let action = self.clone();
        Box::pin(async move {
            let prefix = action.definition.type_prefix.clone();
            if let Err(error) = action.run(store, None).await {
                tracing::warn!(thunk = %prefix, %error, "thunk could not run");
            }
        })
    }
}

#[derive(Clone)]
pub(crate) struct ThunkDispatch<S: State>(pub(crate) Arc<dyn ErasedThunk<S>>);

impl<S: State> PartialEq for ThunkDispatch<S> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<S: State> Debug for ThunkDispatch<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Thunk").field(&self.0.type_prefix()).finish()
    }
}
