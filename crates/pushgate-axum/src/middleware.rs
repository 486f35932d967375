// Request guards: bearer authentication, the tier gate and per-IP rate
// limiting.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use pushgate::middleware::authenticate;
use pushgate::policy::require_tier;
use pushgate::AppContext;
use pushgate_core::db::models::Tier;
use pushgate_core::error::{ApiError, ErrorCode};

use crate::extract::CurrentAccount;
use crate::response::HttpError;

/// Resolve the bearer token to a live account and stash it in the request
/// extensions for `CurrentAccount`.
pub async fn require_auth(State(ctx): State<Arc<AppContext>>, mut req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    match authenticate(&ctx, authorization.as_deref()).await {
        Ok(account) => {
            req.extensions_mut().insert(CurrentAccount(account));
            next.run(req).await
        }
        Err(err) => HttpError(err).into_response(),
    }
}

/// Refuse callers below `required`. Must run inside `require_auth`; it runs
/// before any body is read.
pub async fn require_tier_gate(State(required): State<Tier>, req: Request, next: Next) -> Response {
    let Some(CurrentAccount(account)) = req.extensions().get::<CurrentAccount>() else {
        return HttpError(ApiError::unauthorized(ErrorCode::AuthenticationRequired)).into_response();
    };

    if let Err(denied) = require_tier(account, required, Utc::now()) {
        tracing::debug!(user = %account.id, %required, reason = %denied, "tier gate refused request");
        return HttpError(denied.into()).into_response();
    }

    next.run(req).await
}

/// Fixed-window limit per client IP. Over the limit: 429 with `Retry-After`.
pub async fn rate_limit(State(ctx): State<Arc<AppContext>>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let client = client_ip(req.headers()).or(peer).unwrap_or_else(|| "unknown".to_string());

    if let Err(limited) = ctx.rate_limiter.check(&client) {
        tracing::debug!(%client, retry_after = limited.retry_after, "rate limit exceeded");
        let mut response = HttpError(limited.clone().into()).into_response();
        if let Ok(value) = HeaderValue::from_str(&limited.retry_after.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(req).await
}

/// Client IP from proxy headers, first hop of `X-Forwarded-For` winning.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.2"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
