// Route handlers.
//
// Handlers are framework-agnostic: they take the shared `AppContext`, the
// authenticated account where one is required, and a deserialized request,
// and return an `ApiResponse` or an `ApiError`. HTTP integrations only do
// extraction and envelope rendering.

pub mod auth;
pub mod health;
pub mod notifications;
pub mod response;
pub mod subscriptions;
pub mod users;

pub use response::{ApiResponse, HandlerResult};
