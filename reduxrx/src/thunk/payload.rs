use crate::ThunkError;

/// Converts what a payload creator returns into the thunk outcome.
///
/// `Result` errors become the rejection error and `None` becomes
/// [`ThunkError::None`].
pub trait PayloadResult<T> {
    fn into_payload(self) -> Result<T, ThunkError>;
}

impl<T, E> PayloadResult<T> for Result<T, E>
where
    E: Into<ThunkError>,
{
    fn into_payload(self) -> Result<T, ThunkError> {
        self.map_err(Into::into)
    }
}

impl<T> PayloadResult<T> for Option<T> {
    fn into_payload(self) -> Result<T, ThunkError> {
        self.ok_or(ThunkError::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_maps_error() {
        let ok: Result<i32, String> = Ok(1);
        assert_eq!(ok.into_payload(), Ok(1));
        let err: Result<i32, &str> = Err("boom");
        assert_eq!(err.into_payload(), Err(ThunkError::Failed("boom".to_string())));
        let typed: Result<i32, ThunkError> = Err(ThunkError::CanceledExternally);
        assert_eq!(typed.into_payload(), Err(ThunkError::CanceledExternally));
    }

    #[test]
    fn test_option_maps_none() {
        assert_eq!(Some("x").into_payload(), Ok("x"));
        assert_eq!(None::<i32>.into_payload(), Err(ThunkError::None));
    }
}
