// Subscription purchase, cancellation and renewal, plus the enterprise
// reporting views.
//
// Every change to an account's active subscription is mirrored onto the
// account (`subscriptionType`, `isSubscribed`, `subscriptionExpiry`) so the
// tier gate can decide from the account alone.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use pushgate_core::db::models::{Account, NewSubscription, SubscriptionStatus, Tier};
use pushgate_core::error::{ApiError, ErrorCode};
use pushgate_core::utils::validation::Validator;

use crate::context::AppContext;
use crate::routes::response::{pagination_json, to_json};
use crate::routes::{ApiResponse, HandlerResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    #[serde(rename = "type")]
    pub tier: Option<String>,
    pub price: Option<Value>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenewRequest {
    pub months: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSubscriptionsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
}

/// Accept a JSON number or a numeric string, as long as it is finite and
/// not negative.
fn parse_price(value: Option<&Value>) -> Option<f64> {
    let price = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (price.is_finite() && price >= 0.0).then_some(price)
}

fn parse_months(value: Option<&Value>) -> Option<u32> {
    let months = match value? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (1..=12).contains(&months).then_some(months as u32)
}

fn no_active_subscription() -> ApiError {
    ApiError::not_found(ErrorCode::NoActiveSubscription)
}

/// `GET /api/subscriptions/my-subscription`
pub async fn my_subscription(ctx: &AppContext, account: &Account) -> HandlerResult {
    let subscription = ctx
        .subscriptions
        .latest_for_user(&account.id)
        .await?
        .ok_or_else(|| ApiError::not_found(ErrorCode::SubscriptionNotFound))?;
    Ok(ApiResponse::ok(to_json(&subscription)))
}

/// `POST /api/subscriptions`
pub async fn create(ctx: &AppContext, account: &Account, body: CreateSubscriptionRequest) -> HandlerResult {
    let mut v = Validator::new();
    let tier = v.one_of("type", body.tier.as_deref(), Tier::parse, "Invalid subscription type");
    let price = parse_price(body.price.as_ref());
    if price.is_none() {
        v.push("price", "Price must be a number");
    }
    let (tier, price) = v.require(tier.zip(price))?;

    if ctx.subscriptions.find_active_for_user(&account.id).await?.is_some() {
        return Err(ApiError::bad_request(ErrorCode::ActiveSubscriptionExists));
    }

    let now = Utc::now();
    let subscription = ctx
        .subscriptions
        .create(
            NewSubscription {
                user_id: account.id.clone(),
                tier,
                price,
                currency: body.currency,
                payment_method: body.payment_method,
                payment_id: body.payment_id,
            },
            now,
        )
        .await?;

    ctx.accounts
        .sync_subscription(&account.id, tier, true, subscription.end_date)
        .await?;

    tracing::info!(user = %account.id, %tier, subscription = %subscription.id, "subscription created");
    Ok(ApiResponse::created(to_json(&subscription)).with_message("Subscription created successfully"))
}

/// `PUT /api/subscriptions/cancel`
pub async fn cancel(ctx: &AppContext, account: &Account) -> HandlerResult {
    let mut subscription = ctx
        .subscriptions
        .find_active_for_user(&account.id)
        .await?
        .ok_or_else(no_active_subscription)?;

    subscription.cancel(&account.id, Utc::now());
    let subscription = ctx.subscriptions.save(&subscription).await?;
    ctx.accounts
        .sync_subscription(&account.id, Tier::Free, false, None)
        .await?;

    tracing::info!(user = %account.id, subscription = %subscription.id, "subscription cancelled");
    Ok(ApiResponse::ok(to_json(&subscription)).with_message("Subscription cancelled successfully"))
}

/// `PUT /api/subscriptions/renew`
pub async fn renew(ctx: &AppContext, account: &Account, body: RenewRequest) -> HandlerResult {
    let mut v = Validator::new();
    let months = parse_months(body.months.as_ref());
    if months.is_none() {
        v.push("months", "Months must be between 1 and 12");
    }
    let months = v.require(months)?;

    let mut subscription = ctx
        .subscriptions
        .find_active_for_user(&account.id)
        .await?
        .ok_or_else(no_active_subscription)?;

    subscription.renew(months, Utc::now())?;
    let subscription = ctx.subscriptions.save(&subscription).await?;
    ctx.accounts
        .sync_subscription(&account.id, subscription.tier, true, subscription.end_date)
        .await?;

    Ok(ApiResponse::ok(to_json(&subscription)).with_message("Subscription renewed successfully"))
}

/// `GET /api/subscriptions/all`
pub async fn list_all(ctx: &AppContext, query: ListSubscriptionsQuery) -> HandlerResult {
    let mut v = Validator::new();
    let page = v.pagination(query.page.as_deref(), query.limit.as_deref());
    let status = match query.status.as_deref() {
        None => None,
        raw => v.one_of("status", raw, SubscriptionStatus::parse, "Invalid status"),
    };
    v.finish()?;

    let result = ctx.subscriptions.list(status, page).await?;

    let mut owners: HashMap<String, Value> = HashMap::new();
    for sub in &result.items {
        if owners.contains_key(&sub.user_id) {
            continue;
        }
        let owner = ctx
            .accounts
            .find_by_id(&sub.user_id)
            .await?
            .map(|a| json!({ "id": a.id, "name": a.name, "email": a.email }))
            .unwrap_or(Value::Null);
        owners.insert(sub.user_id.clone(), owner);
    }

    let subscriptions: Vec<Value> = result
        .items
        .iter()
        .map(|sub| {
            let mut entry = to_json(sub);
            entry["user"] = owners.get(&sub.user_id).cloned().unwrap_or(Value::Null);
            entry
        })
        .collect();

    Ok(ApiResponse::ok(json!({
        "subscriptions": subscriptions,
        "pagination": pagination_json(page, result.total),
    })))
}

/// `GET /api/subscriptions/stats`
pub async fn stats(ctx: &AppContext) -> HandlerResult {
    let stats = ctx.subscriptions.stats(Utc::now()).await?;
    Ok(ApiResponse::ok(to_json(&stats)))
}
