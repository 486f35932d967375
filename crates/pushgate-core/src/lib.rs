//! Core types shared by every pushgate crate: domain models, the document
//! store and push provider traits, configuration and the error taxonomy.

pub mod db;
pub mod env;
pub mod error;
pub mod options;
pub mod push;
pub mod utils;

// Re-exports for convenience
pub use db::adapter::Adapter;
pub use db::models::{Account, AccountRecord, Notification, NotificationType, Subscription, Tier};
pub use error::{ApiError, ErrorCode, FieldError, HttpStatus, PushgateError};
pub use options::PushgateOptions;
pub use push::{DisabledPushProvider, MulticastReport, PushError, PushMessage, PushProvider};
