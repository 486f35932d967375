// pushgate services crate
//
// Wires together crypto, the typed stores, the tier policy, the dispatch
// orchestrator, request guards and the framework-agnostic route handlers.

pub mod context;
pub mod crypto;
pub mod dispatch;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod store;

pub use context::AppContext;
pub use dispatch::{dispatch, Audience, DispatchError, DispatchRequest, DispatchSummary};
pub use policy::{require_tier, PolicyError};
pub use routes::{ApiResponse, HandlerResult};
