// Liveness probe and the unmatched-route fallback.

use chrono::Utc;
use serde_json::json;

use pushgate_core::error::{ApiError, ErrorCode};
use pushgate_core::utils::time::format_timestamp;

use crate::context::AppContext;

/// `{ status: "OK", timestamp, uptime }`, rendered without the success
/// envelope.
pub fn health(ctx: &AppContext) -> serde_json::Value {
    json!({
        "status": "OK",
        "timestamp": format_timestamp(&Utc::now()),
        "uptime": ctx.uptime_secs(),
    })
}

pub fn route_not_found() -> ApiError {
    ApiError::not_found(ErrorCode::RouteNotFound)
}
