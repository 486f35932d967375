// Notification inbox, push token registration and dispatch routes.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use pushgate_core::db::models::{Account, NotificationType, Platform, Tier};
use pushgate_core::error::{ApiError, ErrorCode, HttpStatus};
use pushgate_core::utils::id::is_valid_id;
use pushgate_core::utils::validation::Validator;

use crate::context::AppContext;
use crate::dispatch::{dispatch, Audience, DispatchError, DispatchRequest, DispatchSummary};
use crate::routes::response::{pagination_json, to_json};
use crate::routes::{ApiResponse, HandlerResult};

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub token: Option<String>,
    pub platform: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub subscription_type: Option<String>,
    pub data: Option<Value>,
}

/// Body of the direct push routes.
#[derive(Debug, Default, Deserialize)]
pub struct PushRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<Value>,
}

fn validate_data(v: &mut Validator, data: Option<Value>) -> Map<String, Value> {
    match data {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            v.push("data", "Data must be an object");
            Map::new()
        }
    }
}

fn validate_token(v: &mut Validator, token: Option<&str>) -> Option<String> {
    v.text("token", token, 1, usize::MAX, "Push token is required")
}

/// `GET /api/notifications`
pub async fn list(ctx: &AppContext, account: &Account, query: ListQuery) -> HandlerResult {
    let mut v = Validator::new();
    let page = v.pagination(query.page.as_deref(), query.limit.as_deref());
    v.finish()?;

    let result = ctx.notifications.list_for_user(&account.id, page).await?;
    let unread = ctx.notifications.unread_count(&account.id).await?;
    Ok(ApiResponse::ok(json!({
        "notifications": result.items,
        "pagination": pagination_json(page, result.total),
        "unreadCount": unread,
    })))
}

/// `PUT /api/notifications/:id/read`
pub async fn mark_read(ctx: &AppContext, account: &Account, id: &str) -> HandlerResult {
    let notification = ctx.notifications.mark_read(id, &account.id, Utc::now()).await?;
    Ok(ApiResponse::ok(to_json(&notification)).with_message("Notification marked as read"))
}

/// `PUT /api/notifications/read-all`
pub async fn mark_all_read(ctx: &AppContext, account: &Account) -> HandlerResult {
    let updated = ctx.notifications.mark_all_read(&account.id, Utc::now()).await?;
    Ok(ApiResponse::ok(json!({ "updated": updated })).with_message("All notifications marked as read"))
}

/// `POST /api/notifications/register-token`
pub async fn register_token(ctx: &AppContext, account: &Account, body: TokenRequest) -> HandlerResult {
    let mut v = Validator::new();
    let token = validate_token(&mut v, body.token.as_deref());
    let platform = v.one_of(
        "platform",
        body.platform.as_deref(),
        Platform::parse,
        "Platform must be ios, android, or web",
    );
    let (token, platform) = v.require(token.zip(platform))?;

    let updated = ctx.accounts.add_push_token(&account.id, &token).await?;
    tracing::debug!(user = %account.id, ?platform, tokens = updated.push_tokens.len(), "push token registered");
    Ok(ApiResponse::message("Push token registered successfully"))
}

/// `DELETE /api/notifications/remove-token`
pub async fn remove_token(ctx: &AppContext, account: &Account, body: TokenRequest) -> HandlerResult {
    let mut v = Validator::new();
    let token = validate_token(&mut v, body.token.as_deref());
    let token = v.require(token)?;

    ctx.accounts.remove_push_token(&account.id, &token).await?;
    Ok(ApiResponse::message("Push token removed successfully"))
}

/// `POST /api/notifications/send`
///
/// An explicit `userId` wins over `subscriptionType`; with neither, every
/// active account is targeted.
pub async fn send(ctx: &AppContext, body: SendRequest) -> HandlerResult {
    let mut v = Validator::new();
    let title = v.text(
        "title",
        body.title.as_deref(),
        1,
        MAX_TITLE_CHARS,
        "Title is required and must be less than 100 characters",
    );
    let message = v.text(
        "message",
        body.message.as_deref(),
        1,
        MAX_MESSAGE_CHARS,
        "Message is required and must be less than 500 characters",
    );
    let kind = v.one_of(
        "type",
        body.kind.as_deref(),
        NotificationType::parse,
        "Type must be info, warning, success, or error",
    );
    let user_id = match body.user_id {
        Some(id) if !is_valid_id(&id) => {
            v.push("userId", "User ID must be a valid identifier");
            None
        }
        other => other,
    };
    let tier = match body.subscription_type.as_deref() {
        None => None,
        raw => v.one_of(
            "subscriptionType",
            raw,
            Tier::parse,
            "Subscription type must be free, premium, or enterprise",
        ),
    };
    let data = validate_data(&mut v, body.data);
    let ((title, message), kind) = v.require(title.zip(message).zip(kind))?;

    let audience = match (user_id, tier) {
        (Some(id), _) => Audience::Account(id),
        (None, Some(tier)) => Audience::Tier(tier),
        (None, None) => Audience::AllActive,
    };

    let request = DispatchRequest {
        title,
        message,
        kind,
        data,
    };
    let summary = dispatch(ctx, &audience, &request).await?;

    let mut payload = to_json(&summary);
    payload["details"] = json!({
        "title": request.title,
        "message": request.message,
        "type": request.kind,
        "subscriptionType": tier.map_or("all", Tier::as_str),
    });
    Ok(ApiResponse::created(payload).with_message("Notification sent successfully"))
}

fn validate_push(v: &mut Validator, body: PushRequest) -> Option<DispatchRequest> {
    let title = v.text("title", body.title.as_deref(), 1, MAX_TITLE_CHARS, "Title is required");
    let message = v.text("body", body.body.as_deref(), 1, MAX_MESSAGE_CHARS, "Body is required");
    let data = validate_data(v, body.data);
    title.zip(message).map(|(title, message)| DispatchRequest {
        title,
        message,
        kind: NotificationType::Info,
        data,
    })
}

fn delivery_failed(message: &str) -> ApiError {
    ApiError::with_message(HttpStatus::InternalServerError, ErrorCode::PushDeliveryFailed, message)
}

fn token_counts(summary: &DispatchSummary) -> Value {
    json!({
        "successCount": summary.token_successes,
        "failureCount": summary.token_failures,
    })
}

/// `POST /api/notifications/send-push/:userId`
pub async fn send_push(ctx: &AppContext, user_id: &str, body: PushRequest) -> HandlerResult {
    let mut v = Validator::new();
    let request = validate_push(&mut v, body);
    let request = v.require(request)?;

    let target = ctx
        .accounts
        .find_by_id(user_id)
        .await?
        .filter(|a| a.is_active)
        .ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound))?;
    if target.push_tokens.is_empty() {
        return Err(ApiError::bad_request(ErrorCode::NoPushTokens));
    }

    let summary = match dispatch(ctx, &Audience::Account(target.id), &request).await {
        Ok(summary) => summary,
        Err(DispatchError::NoRecipients) => return Err(ApiError::not_found(ErrorCode::UserNotFound)),
        Err(e) => return Err(e.into()),
    };
    if summary.sent == 0 {
        return Err(delivery_failed("Failed to send push notification"));
    }

    Ok(ApiResponse::ok(token_counts(&summary)).with_message("Push notification sent successfully"))
}

/// `POST /api/notifications/send-push-all`
pub async fn send_push_all(ctx: &AppContext, body: PushRequest) -> HandlerResult {
    let mut v = Validator::new();
    let request = validate_push(&mut v, body);
    let request = v.require(request)?;

    let summary = match dispatch(ctx, &Audience::SubscribedWithTokens, &request).await {
        Ok(summary) => summary,
        Err(DispatchError::NoRecipients) => {
            return Err(ApiError::bad_request(ErrorCode::NoSubscribedRecipients))
        }
        Err(e) => return Err(e.into()),
    };
    if summary.sent == 0 {
        return Err(delivery_failed("Failed to send push notifications"));
    }

    let mut payload = token_counts(&summary);
    payload["totalUsers"] = json!(summary.target_users);
    Ok(ApiResponse::ok(payload).with_message("Push notifications sent to all subscribed users"))
}
