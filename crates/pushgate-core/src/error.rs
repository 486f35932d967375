// Error taxonomy shared by every pushgate crate.
//
// `ApiError` is the only error that reaches HTTP clients. Everything else
// (`PushgateError`, store errors, push errors) converts into it at the edge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable machine-readable error codes returned in the `code` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    UserAlreadyExists,
    EmailAlreadyTaken,
    InvalidEmailOrPassword,
    AccountDeactivated,
    AccessTokenRequired,
    InvalidToken,
    AuthenticationRequired,
    SubscriptionRequired,
    SubscriptionExpired,
    UserNotFound,
    NotificationNotFound,
    SubscriptionNotFound,
    NoActiveSubscription,
    NoRecipients,
    NoSubscribedRecipients,
    NoPushTokens,
    ActiveSubscriptionExists,
    SubscriptionNotRenewable,
    PushDeliveryFailed,
    RouteNotFound,
    RateLimitExceeded,
    InternalServerError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ValidationFailed => "Validation failed",
            Self::UserAlreadyExists => "User already exists with this email",
            Self::EmailAlreadyTaken => "Email is already taken",
            Self::InvalidEmailOrPassword => "Invalid email or password",
            Self::AccountDeactivated => "Account is deactivated",
            Self::AccessTokenRequired => "Access token required",
            Self::InvalidToken => "Invalid or expired token",
            Self::AuthenticationRequired => "Authentication required",
            Self::SubscriptionRequired => "Subscription required",
            Self::SubscriptionExpired => "Subscription has expired",
            Self::UserNotFound => "User not found",
            Self::NotificationNotFound => "Notification not found",
            Self::SubscriptionNotFound => "No subscription found",
            Self::NoActiveSubscription => "No active subscription found",
            Self::NoRecipients => "No users found matching the criteria",
            Self::NoSubscribedRecipients => "No subscribed users with push tokens found",
            Self::NoPushTokens => "User has no push tokens registered",
            Self::ActiveSubscriptionExists => "User already has an active subscription",
            Self::SubscriptionNotRenewable => "Subscription cannot be renewed",
            Self::PushDeliveryFailed => "Failed to send push notification",
            Self::RouteNotFound => "Route not found",
            Self::RateLimitExceeded => "Too many requests from this IP, please try again later.",
            Self::InternalServerError => "Internal server error",
        };
        write!(f, "{msg}")
    }
}

/// HTTP status codes used by the API error system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpStatus {
    Ok = 200,
    Created = 201,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    TooManyRequests = 429,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn status_code(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code())
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// HTTP-facing error: status, code, human-readable message and optional
/// per-field validation details.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status} {code:?}: {message}")]
pub struct ApiError {
    pub status: HttpStatus,
    pub code: ErrorCode,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ApiError {
    pub fn new(status: HttpStatus, code: ErrorCode) -> Self {
        Self {
            message: code.to_string(),
            status,
            code,
            errors: Vec::new(),
        }
    }

    pub fn with_message(status: HttpStatus, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn bad_request(code: ErrorCode) -> Self {
        Self::new(HttpStatus::BadRequest, code)
    }

    pub fn unauthorized(code: ErrorCode) -> Self {
        Self::new(HttpStatus::Unauthorized, code)
    }

    pub fn forbidden(code: ErrorCode) -> Self {
        Self::new(HttpStatus::Forbidden, code)
    }

    pub fn not_found(code: ErrorCode) -> Self {
        Self::new(HttpStatus::NotFound, code)
    }

    /// Generic 500. The caller is expected to have logged the cause already.
    pub fn internal() -> Self {
        Self::new(HttpStatus::InternalServerError, ErrorCode::InternalServerError)
    }

    pub fn too_many_requests() -> Self {
        Self::new(HttpStatus::TooManyRequests, ErrorCode::RateLimitExceeded)
    }

    /// 400 carrying every field failure collected during validation.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            status: HttpStatus::BadRequest,
            code: ErrorCode::ValidationFailed,
            message: ErrorCode::ValidationFailed.to_string(),
            errors,
        }
    }

    /// Build the JSON error envelope.
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "success": false,
            "code": self.code,
            "message": self.message,
        });
        if !self.errors.is_empty() {
            body["errors"] = serde_json::json!(self.errors);
        }
        body
    }
}

/// Internal (non-HTTP) error: configuration problems, storage failures,
/// crypto failures and the like.
#[derive(Debug, thiserror::Error)]
pub enum PushgateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A unique index rejected the write. Carries the offending field.
    #[error("Duplicate value for unique field: {0}")]
    Duplicate(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Unified result type for pushgate operations.
pub type Result<T> = std::result::Result<T, PushgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_without_field_errors() {
        let err = ApiError::not_found(ErrorCode::UserNotFound);
        let json = err.to_json();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "USER_NOT_FOUND");
        assert_eq!(json["message"], "User not found");
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_validation_envelope_lists_fields() {
        let err = ApiError::validation(vec![
            FieldError::new("title", "Title is required"),
            FieldError::new("type", "Type must be info, warning, success, or error"),
        ]);
        assert_eq!(err.status.status_code(), 400);
        let json = err.to_json();
        assert_eq!(json["errors"].as_array().unwrap().len(), 2);
        assert_eq!(json["errors"][0]["field"], "title");
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = ApiError::internal();
        assert_eq!(err.status, HttpStatus::InternalServerError);
        assert_eq!(err.message, "Internal server error");
    }
}
