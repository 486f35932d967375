// Registration, login and profile routes.

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use pushgate_core::db::models::{Account, AccountRecord};
use pushgate_core::error::{ApiError, ErrorCode};
use pushgate_core::utils::validation::Validator;

use crate::context::AppContext;
use crate::crypto::{hash_password, sign_access_token, verify_password};
use crate::routes::response::internal_error;
use crate::routes::{ApiResponse, HandlerResult};
use crate::store::StoreError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

fn validate_name(v: &mut Validator, name: Option<&str>) -> Option<String> {
    v.text("name", name, 2, 50, "Name must be between 2 and 50 characters")
}

/// Sign an access token for `account` with the configured lifetime.
pub fn issue_token(ctx: &AppContext, account: &Account) -> Result<String, ApiError> {
    sign_access_token(
        &account.id,
        &account.email,
        &ctx.options.jwt.secret,
        ctx.options.jwt.expires_in,
    )
    .map_err(|e| internal_error("token signing failed", e))
}

/// `POST /api/auth/register`
pub async fn register(ctx: &AppContext, body: RegisterRequest) -> HandlerResult {
    let mut v = Validator::new();
    let name = validate_name(&mut v, body.name.as_deref());
    let email = v.email("email", body.email.as_deref());
    let password = match body.password {
        Some(p) if p.chars().count() >= MIN_PASSWORD_LENGTH => Some(p),
        _ => {
            v.push("password", "Password must be at least 6 characters long");
            None
        }
    };
    let ((name, email), password) = v.require(name.zip(email).zip(password))?;

    if ctx.accounts.find_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request(ErrorCode::UserAlreadyExists));
    }

    let hash = hash_password(&password).map_err(|e| internal_error("password hashing failed", e))?;
    let record = AccountRecord {
        account: Account::new(name, email),
        password: hash,
    };
    let account = match ctx.accounts.create(record).await {
        Ok(account) => account,
        Err(StoreError::Duplicate(_)) => return Err(ApiError::bad_request(ErrorCode::UserAlreadyExists)),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user = %account.id, "account registered");
    let token = issue_token(ctx, &account)?;
    Ok(ApiResponse::created(json!({
        "user": account.to_public_json(),
        "token": token,
    }))
    .with_message("User registered successfully"))
}

/// `POST /api/auth/login`
///
/// The password is checked before the deactivation flag so a wrong password
/// never reveals whether an account is deactivated.
pub async fn login(ctx: &AppContext, body: LoginRequest) -> HandlerResult {
    let mut v = Validator::new();
    let email = v.email("email", body.email.as_deref());
    let password = match body.password {
        Some(p) if !p.is_empty() => Some(p),
        _ => {
            v.push("password", "Password is required");
            None
        }
    };
    let (email, password) = v.require(email.zip(password))?;

    let invalid = || ApiError::unauthorized(ErrorCode::InvalidEmailOrPassword);
    let record = ctx.accounts.find_record_by_email(&email).await?.ok_or_else(invalid)?;

    let matches = verify_password(&record.password, &password).unwrap_or_else(|e| {
        tracing::warn!(user = %record.account.id, error = %e, "stored password hash is unreadable");
        false
    });
    if !matches {
        return Err(invalid());
    }
    if !record.account.is_active {
        return Err(ApiError::unauthorized(ErrorCode::AccountDeactivated));
    }

    let account = ctx.accounts.touch_login(&record.account.id, Utc::now()).await?;
    let token = issue_token(ctx, &account)?;
    Ok(ApiResponse::ok(json!({
        "user": account.to_public_json(),
        "token": token,
    }))
    .with_message("Login successful"))
}

/// `GET /api/auth/me`
pub fn me(account: &Account) -> HandlerResult {
    Ok(ApiResponse::ok(account.to_public_json()))
}

/// `PUT /api/auth/profile`
pub async fn update_profile(ctx: &AppContext, account: Account, body: ProfileRequest) -> HandlerResult {
    let mut v = Validator::new();
    let name = body
        .name
        .as_deref()
        .and_then(|n| validate_name(&mut v, Some(n)));
    let email = body.email.as_deref().and_then(|e| v.email("email", Some(e)));
    v.finish()?;

    let taken = || ApiError::bad_request(ErrorCode::EmailAlreadyTaken);
    if let Some(email) = &email {
        if let Some(other) = ctx.accounts.find_by_email(email).await? {
            if other.id != account.id {
                return Err(taken());
            }
        }
    }

    let mut account = account;
    if let Some(name) = name {
        account.name = name;
    }
    if let Some(email) = email {
        account.email = email;
    }

    let account = match ctx.accounts.save(&account).await {
        Ok(account) => account,
        Err(StoreError::Duplicate(_)) => return Err(taken()),
        Err(e) => return Err(e.into()),
    };
    Ok(ApiResponse::ok(account.to_public_json()).with_message("Profile updated successfully"))
}

/// `POST /api/auth/logout`. Tokens are stateless; nothing is revoked.
pub fn logout() -> HandlerResult {
    Ok(ApiResponse::message("Logout successful"))
}
