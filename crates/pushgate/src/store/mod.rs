// Typed stores over the document `Adapter`.
//
// Handlers never see `serde_json::Value` records: each store converts
// between adapter documents and the domain models in `pushgate_core`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use pushgate_core::error::{ApiError, ErrorCode, FieldError, HttpStatus, PushgateError};

pub mod accounts;
pub mod notifications;
pub mod subscriptions;

pub use accounts::{AccountStore, TierCount, UserStats};
pub use notifications::NotificationStore;
pub use subscriptions::{RevenueStat, SubscriptionStats, SubscriptionStore};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(ErrorCode),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<PushgateError> for StoreError {
    fn from(err: PushgateError) -> Self {
        match err {
            PushgateError::Duplicate(field) => Self::Duplicate(field),
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(code) => ApiError::not_found(code),
            StoreError::Duplicate(field) => ApiError::validation(vec![FieldError::new(
                field.clone(),
                format!("{field} is already in use"),
            )]),
            StoreError::Database(_) | StoreError::Serialization(_) => {
                tracing::error!(error = %err, "store operation failed");
                ApiError::new(HttpStatus::InternalServerError, ErrorCode::InternalServerError)
            }
        }
    }
}

/// Result of a paginated query.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

pub(crate) fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(value)?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(
    values: Vec<serde_json::Value>,
) -> Result<Vec<T>, StoreError> {
    values.into_iter().map(decode).collect()
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_field_error() {
        let err: StoreError = PushgateError::Duplicate("email".into()).into();
        let api: ApiError = err.into();
        assert_eq!(api.status.status_code(), 400);
        assert_eq!(api.errors[0].field, "email");
    }

    #[test]
    fn test_database_error_is_generic_500() {
        let api: ApiError = StoreError::Database("connection reset".into()).into();
        assert_eq!(api.status.status_code(), 500);
        assert_eq!(api.message, "Internal server error");
    }
}
