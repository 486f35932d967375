// Success envelope shared by every handler.

use serde::Serialize;
use serde_json::{json, Value};

use pushgate_core::error::{ApiError, HttpStatus};
use pushgate_core::utils::validation::Pagination;

pub type HandlerResult = Result<ApiResponse, ApiError>;

/// A successful handler result: `{ success: true, message?, data? }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: HttpStatus,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: HttpStatus::Ok,
            message: None,
            data: Some(data),
        }
    }

    pub fn created(data: Value) -> Self {
        Self {
            status: HttpStatus::Created,
            message: None,
            data: Some(data),
        }
    }

    /// 200 with a message and no data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: HttpStatus::Ok,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({ "success": true });
        if let Some(message) = &self.message {
            body["message"] = json!(message);
        }
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        body
    }
}

/// Serialize a response payload. Payload types are plain data, so failure
/// only yields `null`.
pub fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

pub fn pagination_json(page: Pagination, total: u64) -> Value {
    json!({
        "page": page.page,
        "limit": page.limit,
        "total": total,
        "pages": page.pages(total),
    })
}

/// Log an unexpected failure and hide it behind a generic 500.
pub fn internal_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "{context}");
    ApiError::internal()
}
