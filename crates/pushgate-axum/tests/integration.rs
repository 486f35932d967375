// Integration tests for pushgate-axum
//
// HTTP-level tests using tower::ServiceExt::oneshot to exercise the full
// Axum router without starting a real TCP server.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use pushgate::AppContext;
use pushgate_axum::Pushgate;
use pushgate_core::db::models::Tier;
use pushgate_core::options::PushgateOptions;
use pushgate_memory::MemoryAdapter;
use pushgate_test_utils::ScriptedPushProvider;

// ─── Harness ──────────────────────────────────────────────────────

struct TestApp {
    router: Router,
    ctx: Arc<AppContext>,
    push: Arc<ScriptedPushProvider>,
}

async fn app_with(options: PushgateOptions) -> TestApp {
    let push = Arc::new(ScriptedPushProvider::new());
    let ctx = AppContext::new(options, Arc::new(MemoryAdapter::new()), push.clone());
    ctx.init().await.unwrap();
    let pushgate = Pushgate::new(ctx);
    TestApp {
        router: pushgate.router(),
        ctx: pushgate.context().clone(),
        push,
    }
}

async fn app() -> TestApp {
    app_with(PushgateOptions::new("integration-secret")).await
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Register through the API and return `(user id, token)`.
async fn register(app: &TestApp, name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": "hunter22" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

async fn upgrade(app: &TestApp, id: &str, tier: Tier) {
    app.ctx
        .accounts
        .sync_subscription(id, tier, true, Some(Utc::now() + Duration::days(30)))
        .await
        .unwrap();
}

/// An enterprise account's token.
async fn admin(app: &TestApp) -> String {
    let (id, token) = register(app, "Admin", "admin@example.com").await;
    upgrade(app, &id, Tier::Enterprise).await;
    token
}

// ─── Health / Fallback ────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
    assert!(body["uptime"].is_number());
}

#[tokio::test]
async fn unknown_route_is_enveloped_404() {
    let app = app().await;
    let (status, body) = send(&app, request("GET", "/api/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

// ─── Authentication ───────────────────────────────────────────────

#[tokio::test]
async fn me_requires_a_token() {
    let app = app().await;
    let (status, body) = send(&app, request("GET", "/api/auth/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access token required");

    let (status, body) = send(&app, request("GET", "/api/auth/me", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn register_then_me_returns_same_account() {
    let app = app().await;
    let (id, token) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(&app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], id.as_str());
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn deactivated_account_token_stops_working() {
    let app = app().await;
    let (id, token) = register(&app, "Alice", "alice@example.com").await;
    app.ctx.accounts.set_active(&id, false).await.unwrap();

    let (status, _) = send(&app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_json_is_validation_error() {
    let app = app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["errors"][0]["field"], "body");
}

// ─── Tier Gate ────────────────────────────────────────────────────

#[tokio::test]
async fn free_account_is_refused_before_body_validation() {
    let app = app().await;
    let (_, token) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        request("POST", "/api/notifications/send", Some(&token), Some(json!({ "title": "" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "enterprise subscription required");
}

#[tokio::test]
async fn expired_enterprise_is_refused() {
    let app = app().await;
    let (id, token) = register(&app, "Alice", "alice@example.com").await;
    app.ctx
        .accounts
        .sync_subscription(&id, Tier::Enterprise, true, Some(Utc::now() - Duration::days(1)))
        .await
        .unwrap();

    let (status, body) = send(&app, request("GET", "/api/users", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Subscription has expired");
}

#[tokio::test]
async fn premium_is_below_enterprise() {
    let app = app().await;
    let (id, token) = register(&app, "Alice", "alice@example.com").await;
    upgrade(&app, &id, Tier::Premium).await;

    let (status, _) = send(&app, request("GET", "/api/subscriptions/stats", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn gated_route_without_token_is_401_not_403() {
    let app = app().await;
    let (status, _) = send(&app, request("GET", "/api/users/stats/overview", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ─── Notifications ────────────────────────────────────────────────

#[tokio::test]
async fn broadcast_reaches_each_recipient_inbox() {
    let app = app().await;
    let admin = admin(&app).await;
    let (_, alice) = register(&app, "Alice", "alice@example.com").await;
    let (_, bob) = register(&app, "Bob", "bob@example.com").await;

    let (status, _) = send(
        &app,
        request("POST", "/api/notifications/register-token", Some(&alice), Some(json!({ "token": "tok-alice", "platform": "android" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/notifications/send",
            Some(&admin),
            Some(json!({ "title": "Maintenance", "message": "Tonight at 10", "type": "warning" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["notifications"], 3);
    assert_eq!(body["data"]["pushNotificationsSent"], 1);
    assert_eq!(body["data"]["details"]["subscriptionType"], "all");
    assert!(app.push.was_sent_to("tok-alice"));

    for token in [&alice, &bob] {
        let (status, body) = send(&app, request("GET", "/api/notifications", Some(token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["notifications"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["unreadCount"], 1);
    }
}

#[tokio::test]
async fn mark_read_then_read_all() {
    let app = app().await;
    let admin = admin(&app).await;
    let (alice_id, alice) = register(&app, "Alice", "alice@example.com").await;

    for title in ["One", "Two"] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/notifications/send",
                Some(&admin),
                Some(json!({ "title": title, "message": "hi", "type": "info", "userId": alice_id })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, request("GET", "/api/notifications", Some(&alice), None)).await;
    let first = body["data"]["notifications"][0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/notifications/{first}/read");
    let (status, body) = send(&app, request("PUT", &uri, Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isRead"], true);

    // Someone else's notification is invisible.
    let (_, bob) = register(&app, "Bob", "bob@example.com").await;
    let (status, _) = send(&app, request("PUT", &uri, Some(&bob), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, request("PUT", "/api/notifications/read-all", Some(&alice), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 1);

    let (_, body) = send(&app, request("GET", "/api/notifications", Some(&alice), None)).await;
    assert_eq!(body["data"]["unreadCount"], 0);
}

#[tokio::test]
async fn send_push_to_user_without_tokens_is_400() {
    let app = app().await;
    let admin = admin(&app).await;
    let (alice_id, _) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/api/notifications/send-push/{alice_id}"),
            Some(&admin),
            Some(json!({ "title": "Hi", "body": "there" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User has no push tokens registered");
    assert_eq!(app.push.call_count(), 0);
}

// ─── Subscriptions ────────────────────────────────────────────────

#[tokio::test]
async fn subscription_lifecycle_is_mirrored_on_profile() {
    let app = app().await;
    let (_, token) = register(&app, "Alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/subscriptions",
            Some(&token),
            Some(json!({ "type": "premium", "price": 9.99 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, me) = send(&app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(me["data"]["subscriptionType"], "premium");
    assert_eq!(me["data"]["isSubscribed"], true);

    let (status, _) = send(&app, request("PUT", "/api/subscriptions/cancel", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = send(&app, request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(me["data"]["subscriptionType"], "free");
}

// ─── Rate Limiting ────────────────────────────────────────────────

#[tokio::test]
async fn rate_limit_sets_retry_after() {
    let mut options = PushgateOptions::new("integration-secret");
    options.rate_limit.max = 2;
    let app = app_with(options).await;

    let from = |ip: &str| {
        Request::builder()
            .uri("/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..2 {
        let response = app.router.clone().oneshot(from("10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.router.clone().oneshot(from("10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));

    // Another client is unaffected.
    let response = app.router.clone().oneshot(from("10.0.0.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
