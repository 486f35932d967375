// Envelope rendering for handler results and errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use pushgate::routes::ApiResponse;
use pushgate_core::error::{ApiError, HttpStatus};

fn status_code(status: HttpStatus) -> StatusCode {
    StatusCode::from_u16(status.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// A successful handler result rendered as `{ success: true, ... }`.
#[derive(Debug)]
pub struct Reply(pub ApiResponse);

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (status_code(self.0.status), Json(self.0.to_json())).into_response()
    }
}

/// An `ApiError` rendered as `{ success: false, code, message, errors? }`.
#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (status_code(self.0.status), Json(self.0.to_json())).into_response()
    }
}

pub type HttpResult = Result<Reply, HttpError>;

/// Adapt a framework-agnostic handler result.
pub fn reply(result: pushgate::HandlerResult) -> HttpResult {
    result.map(Reply).map_err(HttpError)
}
