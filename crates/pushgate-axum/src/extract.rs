// Extractors that reject with the JSON error envelope instead of axum's
// plain-text rejections.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use pushgate_core::db::models::Account;
use pushgate_core::error::{ApiError, ErrorCode, FieldError};

use crate::response::HttpError;

/// JSON request body. Malformed JSON or a wrong field type is a 400
/// validation failure.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(HttpError(ApiError::validation(vec![FieldError::new(
                "body",
                rejection.body_text(),
            )]))),
        }
    }
}

/// Query string parameters.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(HttpError(ApiError::validation(vec![FieldError::new(
                "query",
                rejection.body_text(),
            )]))),
        }
    }
}

/// The account resolved by the authentication middleware.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentAccount>()
            .cloned()
            .ok_or_else(|| HttpError(ApiError::unauthorized(ErrorCode::AuthenticationRequired)))
    }
}
