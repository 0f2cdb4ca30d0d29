use crate::ThunkError;

/// Metadata of the `pending` action of an async thunk.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingMeta<A> {
    pub request_id: String,
    pub arg: A,
}

/// Metadata of the `fulfilled` action of an async thunk.
#[derive(Clone, Debug, PartialEq)]
pub struct FulfilledMeta<A> {
    pub request_id: String,
    pub arg: A,
}

/// Metadata of the `rejected` action of an async thunk.
///
/// `aborted` and `rejected_with_value` tell an abort, a rejection with value
/// and a failure apart; `error` alone cannot, since all of them cancel the
/// same token.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedMeta<A> {
    pub request_id: String,
    pub arg: A,
    /// Set when the thunk called [`ThunkApi::abort`](crate::ThunkApi::abort).
    pub aborted: bool,
    pub reason: Option<String>,
    /// Set when the thunk was rejected because its condition returned false.
    pub condition: bool,
    pub rejected_with_value: bool,
    pub error: Option<ThunkError>,
}

impl<A> RejectedMeta<A> {
    pub(crate) fn new(request_id: String, arg: A, error: ThunkError) -> Self {
        RejectedMeta {
            request_id,
            arg,
            aborted: false,
            reason: None,
            condition: false,
            rejected_with_value: false,
            error: Some(error),
        }
    }
}
