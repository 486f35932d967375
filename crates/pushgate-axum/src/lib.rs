#![doc = include_str!("../README.md")]

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pushgate::routes::{self, auth, notifications, subscriptions, users};
use pushgate::AppContext;
use pushgate_core::db::models::Tier;

pub mod extract;
pub mod middleware;
pub mod response;

use extract::{CurrentAccount, JsonBody, QueryParams};
use response::{reply, HttpError, HttpResult};

/// Request bodies above this size are refused.
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Axum integration for pushgate.
///
/// ```rust,ignore
/// let app = Pushgate::new(ctx).router();
/// ```
#[derive(Debug, Clone)]
pub struct Pushgate {
    ctx: Arc<AppContext>,
}

impl Pushgate {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn from_context(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// The full application: `/health`, the `/api/*` routers, the 404
    /// fallback, rate limiting, CORS and request tracing.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handle_health))
            .nest("/api/auth", self.auth_routes())
            .nest("/api/users", self.user_routes())
            .nest("/api/notifications", self.notification_routes())
            .nest("/api/subscriptions", self.subscription_routes())
            .fallback(handle_not_found)
            .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
            .layer(axum_mw::from_fn_with_state(self.ctx.clone(), middleware::rate_limit))
            .layer(self.cors_layer())
            .layer(TraceLayer::new_for_http())
            .with_state(self.ctx.clone())
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .ctx
            .options
            .cors
            .origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    }

    /// Layers `require_auth` over `router`.
    fn authenticated(&self, router: Router<Arc<AppContext>>) -> Router<Arc<AppContext>> {
        router.route_layer(axum_mw::from_fn_with_state(self.ctx.clone(), middleware::require_auth))
    }

    /// Layers the enterprise gate, then `require_auth`, over `router`.
    fn enterprise(&self, router: Router<Arc<AppContext>>) -> Router<Arc<AppContext>> {
        self.authenticated(
            router.route_layer(axum_mw::from_fn_with_state(Tier::Enterprise, middleware::require_tier_gate)),
        )
    }

    fn auth_routes(&self) -> Router<Arc<AppContext>> {
        let public = Router::new()
            .route("/register", post(handle_register))
            .route("/login", post(handle_login));

        let private = self.authenticated(
            Router::new()
                .route("/me", get(handle_me))
                .route("/profile", put(handle_update_profile))
                .route("/logout", post(handle_logout)),
        );

        public.merge(private)
    }

    fn user_routes(&self) -> Router<Arc<AppContext>> {
        self.enterprise(
            Router::new()
                .route("/", get(handle_list_users))
                .route("/stats/overview", get(handle_user_stats))
                .route("/{id}", get(handle_get_user))
                .route("/{id}/status", put(handle_update_user_status)),
        )
    }

    fn notification_routes(&self) -> Router<Arc<AppContext>> {
        let inbox = self.authenticated(
            Router::new()
                .route("/", get(handle_list_notifications))
                .route("/read-all", put(handle_read_all))
                .route("/{id}/read", put(handle_mark_read))
                .route("/register-token", post(handle_register_token))
                .route("/remove-token", delete(handle_remove_token)),
        );

        let dispatch = self.enterprise(
            Router::new()
                .route("/send", post(handle_send))
                .route("/send-push/{user_id}", post(handle_send_push))
                .route("/send-push-all", post(handle_send_push_all)),
        );

        inbox.merge(dispatch)
    }

    fn subscription_routes(&self) -> Router<Arc<AppContext>> {
        let own = self.authenticated(
            Router::new()
                .route("/", post(handle_create_subscription))
                .route("/my-subscription", get(handle_my_subscription))
                .route("/cancel", put(handle_cancel_subscription))
                .route("/renew", put(handle_renew_subscription)),
        );

        let reports = self.enterprise(
            Router::new()
                .route("/all", get(handle_list_subscriptions))
                .route("/stats", get(handle_subscription_stats)),
        );

        own.merge(reports)
    }
}

type Ctx = State<Arc<AppContext>>;

// ─── Health / Fallback ──────────────────────────────────────────

async fn handle_health(State(ctx): Ctx) -> impl IntoResponse {
    Json(routes::health::health(&ctx))
}

async fn handle_not_found() -> Response {
    HttpError(routes::health::route_not_found()).into_response()
}

// ─── Auth ───────────────────────────────────────────────────────

async fn handle_register(State(ctx): Ctx, JsonBody(body): JsonBody<auth::RegisterRequest>) -> HttpResult {
    reply(auth::register(&ctx, body).await)
}

async fn handle_login(State(ctx): Ctx, JsonBody(body): JsonBody<auth::LoginRequest>) -> HttpResult {
    reply(auth::login(&ctx, body).await)
}

async fn handle_me(CurrentAccount(account): CurrentAccount) -> HttpResult {
    reply(auth::me(&account))
}

async fn handle_update_profile(
    State(ctx): Ctx,
    CurrentAccount(account): CurrentAccount,
    JsonBody(body): JsonBody<auth::ProfileRequest>,
) -> HttpResult {
    reply(auth::update_profile(&ctx, account, body).await)
}

async fn handle_logout() -> HttpResult {
    reply(auth::logout())
}

// ─── Users ──────────────────────────────────────────────────────

async fn handle_list_users(State(ctx): Ctx, QueryParams(query): QueryParams<users::ListUsersQuery>) -> HttpResult {
    reply(users::list_users(&ctx, query).await)
}

async fn handle_get_user(State(ctx): Ctx, Path(id): Path<String>) -> HttpResult {
    reply(users::get_user(&ctx, &id).await)
}

async fn handle_update_user_status(
    State(ctx): Ctx,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<users::UpdateStatusRequest>,
) -> HttpResult {
    reply(users::update_status(&ctx, &id, body).await)
}

async fn handle_user_stats(State(ctx): Ctx) -> HttpResult {
    reply(users::stats(&ctx).await)
}

// ─── Notifications ──────────────────────────────────────────────

async fn handle_list_notifications(
    State(ctx): Ctx,
    CurrentAccount(account): CurrentAccount,
    QueryParams(query): QueryParams<notifications::ListQuery>,
) -> HttpResult {
    reply(notifications::list(&ctx, &account, query).await)
}

async fn handle_mark_read(
    State(ctx): Ctx,
    CurrentAccount(account): CurrentAccount,
    Path(id): Path<String>,
) -> HttpResult {
    reply(notifications::mark_read(&ctx, &account, &id).await)
}

async fn handle_read_all(State(ctx): Ctx, CurrentAccount(account): CurrentAccount) -> HttpResult {
    reply(notifications::mark_all_read(&ctx, &account).await)
}

async fn handle_register_token(
    State(ctx): Ctx,
    CurrentAccount(account): CurrentAccount,
    JsonBody(body): JsonBody<notifications::TokenRequest>,
) -> HttpResult {
    reply(notifications::register_token(&ctx, &account, body).await)
}

async fn handle_remove_token(
    State(ctx): Ctx,
    CurrentAccount(account): CurrentAccount,
    JsonBody(body): JsonBody<notifications::TokenRequest>,
) -> HttpResult {
    reply(notifications::remove_token(&ctx, &account, body).await)
}

async fn handle_send(State(ctx): Ctx, JsonBody(body): JsonBody<notifications::SendRequest>) -> HttpResult {
    reply(notifications::send(&ctx, body).await)
}

async fn handle_send_push(
    State(ctx): Ctx,
    Path(user_id): Path<String>,
    JsonBody(body): JsonBody<notifications::PushRequest>,
) -> HttpResult {
    reply(notifications::send_push(&ctx, &user_id, body).await)
}

async fn handle_send_push_all(State(ctx): Ctx, JsonBody(body): JsonBody<notifications::PushRequest>) -> HttpResult {
    reply(notifications::send_push_all(&ctx, body).await)
}

// ─── Subscriptions ──────────────────────────────────────────────

async fn handle_my_subscription(State(ctx): Ctx, CurrentAccount(account): CurrentAccount) -> HttpResult {
    reply(subscriptions::my_subscription(&ctx, &account).await)
}

async fn handle_create_subscription(
    State(ctx): Ctx,
    CurrentAccount(account): CurrentAccount,
    JsonBody(body): JsonBody<subscriptions::CreateSubscriptionRequest>,
) -> HttpResult {
    reply(subscriptions::create(&ctx, &account, body).await)
}

async fn handle_cancel_subscription(State(ctx): Ctx, CurrentAccount(account): CurrentAccount) -> HttpResult {
    reply(subscriptions::cancel(&ctx, &account).await)
}

async fn handle_renew_subscription(
    State(ctx): Ctx,
    CurrentAccount(account): CurrentAccount,
    JsonBody(body): JsonBody<subscriptions::RenewRequest>,
) -> HttpResult {
    reply(subscriptions::renew(&ctx, &account, body).await)
}

async fn handle_list_subscriptions(
    State(ctx): Ctx,
    QueryParams(query): QueryParams<subscriptions::ListSubscriptionsQuery>,
) -> HttpResult {
    reply(subscriptions::list_all(&ctx, query).await)
}

async fn handle_subscription_stats(State(ctx): Ctx) -> HttpResult {
    reply(subscriptions::stats(&ctx).await)
}
