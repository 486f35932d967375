// Request guards shared by every HTTP integration: bearer authentication
// and per-client rate limiting.

pub mod auth;
pub mod rate_limiter;

pub use auth::{authenticate, bearer_token};
pub use rate_limiter::{RateLimited, RateLimiter};
