//! JSON body extractor with `{error, message}` rejections.

use axum::{
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    response::Response,
};

use crate::app::errors;

/// Drop-in for `axum::Json` whose rejections use the API error shape.
///
/// Bodies that are not valid JSON, or carry a field of the wrong type, are
/// reported as 400 `validation_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(errors::json_rejection_to_response(rejection)),
        }
    }
}
