// Bearer authentication.
//
// The account behind a token is loaded fresh on every request, so
// deactivation and tier changes take effect immediately.

use pushgate_core::db::models::Account;
use pushgate_core::error::{ApiError, ErrorCode};

use crate::context::AppContext;
use crate::crypto::jwt::verify_access_token;

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the caller from an `Authorization` header value.
///
/// Missing token: 401 `Access token required`. Bad signature, expiry,
/// unknown or deactivated account: 401 `Invalid or expired token`.
pub async fn authenticate(ctx: &AppContext, authorization: Option<&str>) -> Result<Account, ApiError> {
    let token = bearer_token(authorization)
        .ok_or_else(|| ApiError::unauthorized(ErrorCode::AccessTokenRequired))?;

    let claims = verify_access_token(token, &ctx.options.jwt.secret)
        .ok_or_else(|| ApiError::unauthorized(ErrorCode::InvalidToken))?;

    match ctx.accounts.find_by_id(&claims.user_id).await? {
        Some(account) if account.is_active => Ok(account),
        _ => Err(ApiError::unauthorized(ErrorCode::InvalidToken)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("bearer  abc ")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(Some("Bearer")), None);
        assert_eq!(bearer_token(None), None);
    }
}
