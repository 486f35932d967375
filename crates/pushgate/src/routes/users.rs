// Account administration routes. Every handler here is enterprise-gated by
// the HTTP layer.

use serde::Deserialize;
use serde_json::json;

use pushgate_core::db::models::Tier;
use pushgate_core::error::{ApiError, ErrorCode};
use pushgate_core::utils::time::format_timestamp;
use pushgate_core::utils::validation::Validator;

use crate::context::AppContext;
use crate::routes::response::pagination_json;
use crate::routes::{ApiResponse, HandlerResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub subscription_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: Option<serde_json::Value>,
}

/// `GET /api/users`
pub async fn list_users(ctx: &AppContext, query: ListUsersQuery) -> HandlerResult {
    let mut v = Validator::new();
    let page = v.pagination(query.page.as_deref(), query.limit.as_deref());
    let tier = match query.subscription_type.as_deref() {
        None => None,
        Some(raw) => v.one_of("subscriptionType", Some(raw), Tier::parse, "Invalid subscription type"),
    };
    v.finish()?;

    let result = ctx.accounts.list(tier, page).await?;
    let users: Vec<_> = result.items.iter().map(|a| a.to_public_json()).collect();
    Ok(ApiResponse::ok(json!({
        "users": users,
        "pagination": pagination_json(page, result.total),
    })))
}

/// `GET /api/users/:id`
pub async fn get_user(ctx: &AppContext, id: &str) -> HandlerResult {
    let account = ctx
        .accounts
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound))?;
    Ok(ApiResponse::ok(account.to_public_json()))
}

/// `PUT /api/users/:id/status`
pub async fn update_status(ctx: &AppContext, id: &str, body: UpdateStatusRequest) -> HandlerResult {
    let mut v = Validator::new();
    let is_active = body.is_active.as_ref().and_then(serde_json::Value::as_bool);
    if is_active.is_none() {
        v.push("isActive", "isActive must be a boolean");
    }
    let is_active = v.require(is_active)?;

    if ctx.accounts.find_by_id(id).await?.is_none() {
        return Err(ApiError::not_found(ErrorCode::UserNotFound));
    }
    let account = ctx.accounts.set_active(id, is_active).await?;
    tracing::info!(user = %account.id, is_active, "account status changed");
    Ok(ApiResponse::ok(account.to_public_json()).with_message("User status updated successfully"))
}

/// `GET /api/users/stats/overview`
pub async fn stats(ctx: &AppContext) -> HandlerResult {
    let stats = ctx.accounts.stats().await?;
    let recent: Vec<_> = stats
        .recent_users
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "name": a.name,
                "email": a.email,
                "createdAt": format_timestamp(&a.created_at),
                "subscriptionType": a.subscription_type,
            })
        })
        .collect();

    Ok(ApiResponse::ok(json!({
        "totalUsers": stats.total_users,
        "activeUsers": stats.active_users,
        "subscribedUsers": stats.subscribed_users,
        "subscriptionStats": stats.subscription_stats,
        "recentUsers": recent,
    })))
}
